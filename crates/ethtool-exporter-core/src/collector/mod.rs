//! Per-interface NIC statistics collector for Linux.
//!
//! This module enumerates network interfaces from `/sys/class/net`, runs
//! `ethtool -S` for each of them and turns the output into normalized
//! observations. Filesystem access and process execution go through traits so
//! the whole pipeline can run against mocks in tests and on non-Linux hosts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │ InterfaceEnumerator │   │      EthtoolCollector       │  │
//! │  │  - /sys/class/net   │   │  - ethtool -S <iface>       │  │
//! │  │  - InterfaceFilter  │   │  - parser + normalize       │  │
//! │  └──────────┬──────────┘   └──────────────┬──────────────┘  │
//! │             │                             │                 │
//! │      ┌──────▼──────┐               ┌──────▼───────┐         │
//! │      │  FileSystem │ (trait)       │ CommandRunner│ (trait) │
//! │      └──────┬──────┘               └──────┬───────┘         │
//! └─────────────┼─────────────────────────────┼─────────────────┘
//!               │                             │
//!        ┌──────┴──────┐               ┌──────┴──────┐
//!        │ RealFs      │               │ RealRunner  │
//!        │ MockFs      │               │ MockRunner  │
//!        └─────────────┘               └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use ethtool_exporter_core::collector::{Collector, RealFs, RealRunner};
//!
//! let ethtool = locate_ethtool(&RealFs::new(), None)?;
//! let mut collector = Collector::new(RealFs::new(), RealRunner::new(), ethtool);
//! let set = collector.collect();
//! ```
//!
//! ## Testing (with mocks)
//!
//! ```
//! use ethtool_exporter_core::collector::Collector;
//! use ethtool_exporter_core::collector::mock::scenarios;
//!
//! let (fs, runner) = scenarios::typical_host();
//! let mut collector = Collector::new(fs, runner, scenarios::ETHTOOL_PATH);
//! let set = collector.collect();
//! assert!(!set.is_empty());
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod ethtool;
pub mod mock;
pub mod sysfs;
pub mod traits;

pub use collector::{Collector, CycleStats, ExpositionSet, Observation, ObservationSource};
pub use ethtool::{
    EthtoolCollector, ParseError, StartupError, check_version, locate_ethtool, metric_name,
};
pub use mock::{MockFs, MockRunner};
pub use sysfs::{EnumerationError, Interface, InterfaceEnumerator, InterfaceFilter};
pub use traits::{CommandOutput, CommandRunner, FileSystem, RealFs, RealRunner};
