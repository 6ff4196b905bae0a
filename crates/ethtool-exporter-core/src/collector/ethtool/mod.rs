//! Everything that talks to the `ethtool` binary.
//!
//! - `locate` - startup probing of the binary and its version
//! - `parser` - `ethtool -S` output parsing
//! - `normalize` - label to metric name mapping
//! - `collector` - per-interface invocation

pub mod collector;
pub mod locate;
pub mod normalize;
pub mod parser;

pub use collector::EthtoolCollector;
pub use locate::{
    DEFAULT_CANDIDATES, EthtoolVersion, MIN_VERSION, StartupError, check_version, locate_ethtool,
};
pub use normalize::metric_name;
pub use parser::{ParseError, RawStat, parse_stat_line, parse_stats};
