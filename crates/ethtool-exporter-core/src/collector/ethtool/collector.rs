//! Per-interface statistics via `ethtool -S`.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::collector::Observation;
use crate::collector::ethtool::normalize::metric_name;
use crate::collector::ethtool::parser::parse_stats;
use crate::collector::traits::CommandRunner;

/// Runs `ethtool -S` for one interface at a time and converts the output
/// into observations.
pub struct EthtoolCollector<R: CommandRunner> {
    runner: R,
    ethtool: PathBuf,
}

impl<R: CommandRunner> EthtoolCollector<R> {
    /// # Arguments
    /// * `runner` - Process runner (real or mock)
    /// * `ethtool` - Resolved path of the `ethtool` binary
    pub fn new(runner: R, ethtool: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            ethtool: ethtool.into(),
        }
    }

    pub fn ethtool_path(&self) -> &Path {
        &self.ethtool
    }

    /// Collects the statistics of a single interface.
    ///
    /// Returns `None` when `ethtool` could not be launched or exited with an
    /// error, which is normal for devices whose driver has no statistics
    /// (loopback, bridges, tunnels). Malformed lines are skipped inside the
    /// parser and never fail the interface.
    pub fn try_collect(&self, iface: &str) -> Option<Vec<Observation>> {
        let out = match self.runner.run(&self.ethtool, &["-S", iface]) {
            Ok(out) => out,
            Err(e) => {
                debug!(interface = iface, error = %e, "failed to launch ethtool");
                return None;
            }
        };

        if !out.success {
            debug!(
                interface = iface,
                code = ?out.code,
                stderr = out.stderr.trim(),
                "ethtool returned an error"
            );
            return None;
        }

        let observations: Vec<Observation> = parse_stats(iface, &out.stdout)
            .into_iter()
            .map(|stat| Observation {
                metric_name: metric_name(&stat.label),
                interface: iface.to_string(),
                value: stat.value,
            })
            .collect();
        trace!(interface = iface, count = observations.len(), "parsed ethtool stats");
        Some(observations)
    }

    /// Like [`EthtoolCollector::try_collect`], with failures mapped to an
    /// empty result.
    pub fn collect_interface_stats(&self, iface: &str) -> Vec<Observation> {
        self.try_collect(iface).unwrap_or_default()
    }
}
