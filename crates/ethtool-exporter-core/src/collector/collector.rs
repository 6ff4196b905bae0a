//! Collection cycle: enumerate interfaces, then run `ethtool -S` on each.
//!
//! The `Collector` struct ties the enumerator and the per-interface
//! collector together and produces one `ExpositionSet` per call.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::collector::ethtool::EthtoolCollector;
use crate::collector::sysfs::{DEFAULT_NET_PATH, InterfaceEnumerator, InterfaceFilter};
use crate::collector::traits::{CommandRunner, FileSystem};

/// One normalized value for one interface.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub metric_name: String,
    pub interface: String,
    pub value: f64,
}

/// All observations of one collection cycle.
///
/// Keyed by `(metric_name, interface)`: inserting the same pair twice keeps
/// the position of the first insert and the value of the last.
#[derive(Debug, Clone, Default)]
pub struct ExpositionSet {
    observations: Vec<Observation>,
    index: HashMap<(String, String), usize>,
}

impl ExpositionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, obs: Observation) {
        let key = (obs.metric_name.clone(), obs.interface.clone());
        match self.index.get(&key) {
            Some(&pos) => self.observations[pos] = obs,
            None => {
                self.index.insert(key, self.observations.len());
                self.observations.push(obs);
            }
        }
    }

    pub fn extend(&mut self, observations: impl IntoIterator<Item = Observation>) {
        for obs in observations {
            self.insert(obs);
        }
    }

    pub fn get(&self, metric_name: &str, interface: &str) -> Option<f64> {
        self.index
            .get(&(metric_name.to_string(), interface.to_string()))
            .map(|&pos| self.observations[pos].value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Names of the interfaces that contributed at least one observation.
    pub fn interfaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.observations.iter().map(|o| o.interface.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Bookkeeping for the last collection cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Wall-clock time of the whole cycle.
    pub duration: Duration,
    /// Whether the device registry could be read.
    pub enumeration_ok: bool,
    /// Interfaces returned by the enumerator.
    pub interfaces: usize,
    /// Interfaces for which `ethtool` failed.
    pub failed_interfaces: usize,
    /// Observations in the resulting set.
    pub observations: usize,
}

/// Anything that can run a full collection cycle.
///
/// The exporter holds its source as a trait object so the binary can pick a
/// real or mocked collector at startup.
pub trait ObservationSource: Send {
    fn collect(&mut self) -> ExpositionSet;

    fn last_cycle(&self) -> Option<&CycleStats>;
}

/// Main collector combining interface enumeration and `ethtool -S`.
pub struct Collector<F: FileSystem, R: CommandRunner> {
    enumerator: InterfaceEnumerator<F>,
    ethtool: EthtoolCollector<R>,
    last_cycle: Option<CycleStats>,
}

impl<F: FileSystem, R: CommandRunner> Collector<F, R> {
    /// Creates a collector reading `/sys/class/net` with no interface filter.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Process runner (real or mock)
    /// * `ethtool` - Resolved path of the `ethtool` binary
    pub fn new(fs: F, runner: R, ethtool: impl Into<PathBuf>) -> Self {
        Self {
            enumerator: InterfaceEnumerator::new(fs, DEFAULT_NET_PATH),
            ethtool: EthtoolCollector::new(runner, ethtool),
            last_cycle: None,
        }
    }

    /// Reads interfaces from a different directory than `/sys/class/net`.
    pub fn with_net_path(mut self, net_path: impl Into<PathBuf>) -> Self {
        self.enumerator = self.enumerator.with_net_path(net_path);
        self
    }

    pub fn with_filter(mut self, filter: InterfaceFilter) -> Self {
        self.enumerator = self.enumerator.with_filter(filter);
        self
    }

    pub fn enumerator(&self) -> &InterfaceEnumerator<F> {
        &self.enumerator
    }

    /// Runs one full cycle.
    ///
    /// Never fails: an unreadable device registry yields an empty set, and
    /// interfaces whose `ethtool` call fails are left out.
    pub fn collect(&mut self) -> ExpositionSet {
        let start = Instant::now();
        let mut set = ExpositionSet::new();
        let mut stats = CycleStats::default();

        match self.enumerator.list_interfaces() {
            Ok(interfaces) => {
                stats.enumeration_ok = true;
                stats.interfaces = interfaces.len();
                for iface in &interfaces {
                    match self.ethtool.try_collect(&iface.name) {
                        Some(observations) => set.extend(observations),
                        None => stats.failed_interfaces += 1,
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "interface enumeration failed");
            }
        }

        stats.observations = set.len();
        stats.duration = start.elapsed();
        debug!(
            interfaces = stats.interfaces,
            failed = stats.failed_interfaces,
            observations = stats.observations,
            duration_ms = stats.duration.as_millis() as u64,
            "collection cycle finished"
        );
        self.last_cycle = Some(stats);
        set
    }

    /// Statistics of the last `collect` call.
    pub fn last_cycle(&self) -> Option<&CycleStats> {
        self.last_cycle.as_ref()
    }
}

impl<F: FileSystem, R: CommandRunner> ObservationSource for Collector<F, R> {
    fn collect(&mut self) -> ExpositionSet {
        Collector::collect(self)
    }

    fn last_cycle(&self) -> Option<&CycleStats> {
        Collector::last_cycle(self)
    }
}
