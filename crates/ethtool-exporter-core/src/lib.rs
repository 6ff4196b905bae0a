//! ethtool-exporter-core - collection pipeline for the ethtool exporter.
//!
//! Provides:
//! - `collector` - interface enumeration, `ethtool -S` invocation, parsing
//!   and name normalization, plus mocks for testing
//! - `exporter` - declare-on-first-use metric registry and text rendering
//!   behind a single collection lock

pub mod collector;
pub mod exporter;

/// Crate version with the short git SHA of the build.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ETHTOOL_EXPORTER_GIT_SHA"),
    ")"
);

/// Prefix of every metric name exposed by the exporter.
pub const NAMESPACE: &str = "ethtool";
