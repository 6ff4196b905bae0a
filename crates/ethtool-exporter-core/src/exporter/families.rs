//! Declare-on-first-use gauge families for dynamically discovered names.
//!
//! The set of metric names is only known after `ethtool` has run, and it
//! differs between drivers. Each normalized name gets one `GaugeVec` with an
//! `interface` label, registered the first time the name is seen and reused
//! for every later interface and cycle.

use std::collections::HashMap;

use prometheus::{GaugeVec, Opts, Registry};
use tracing::{debug, warn};

use crate::collector::ExpositionSet;

const HELP: &str = "ethtool -S interface statistic";

/// Maps a normalized metric name onto the exposition format's token rules.
///
/// Valid names match `[a-zA-Z_:][a-zA-Z0-9_:]*`; any other character becomes
/// `_`.
pub fn sanitize_metric_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        let valid =
            c.is_ascii_alphabetic() || c == '_' || c == ':' || (i > 0 && c.is_ascii_digit());
        out.push(if valid { c } else { '_' });
    }
    out
}

enum Family {
    Registered(GaugeVec),
    /// The name could not be registered; its observations are dropped.
    Rejected,
}

/// Registry of gauge families keyed by normalized metric name.
///
/// Only mutated under the exporter's collection lock.
pub struct GaugeFamilies {
    registry: Registry,
    families: HashMap<String, Family>,
    /// Exposition name to the normalized name that owns it.
    owners: HashMap<String, String>,
}

impl GaugeFamilies {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            families: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families
            .values()
            .filter(|f| matches!(f, Family::Registered(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `metric_name` has a registered family.
    pub fn is_registered(&self, metric_name: &str) -> bool {
        matches!(self.families.get(metric_name), Some(Family::Registered(_)))
    }

    /// Replaces the exposed values with the contents of `set`.
    ///
    /// Every family is cleared first, so interfaces or counters missing from
    /// this cycle disappear from the output instead of keeping stale values.
    pub fn apply(&mut self, set: &ExpositionSet) {
        for family in self.families.values() {
            if let Family::Registered(gauge) = family {
                gauge.reset();
            }
        }

        for obs in set.iter() {
            if let Some(gauge) = self.declare(&obs.metric_name) {
                gauge
                    .with_label_values(&[obs.interface.as_str()])
                    .set(obs.value);
            }
        }
    }

    fn declare(&mut self, metric_name: &str) -> Option<&GaugeVec> {
        if !self.families.contains_key(metric_name) {
            let family = self.register(metric_name);
            self.families.insert(metric_name.to_string(), family);
        }
        match self.families.get(metric_name) {
            Some(Family::Registered(gauge)) => Some(gauge),
            _ => None,
        }
    }

    fn register(&mut self, metric_name: &str) -> Family {
        let exposed = sanitize_metric_name(metric_name);
        if let Some(owner) = self.owners.get(&exposed) {
            warn!(
                metric = metric_name,
                exposed = %exposed,
                owner = %owner,
                "metric name collides with another ethtool statistic, skipping"
            );
            return Family::Rejected;
        }

        let gauge = match GaugeVec::new(Opts::new(exposed.clone(), HELP), &["interface"]) {
            Ok(gauge) => gauge,
            Err(e) => {
                warn!(metric = metric_name, error = %e, "invalid metric, skipping");
                return Family::Rejected;
            }
        };
        if let Err(e) = self.registry.register(Box::new(gauge.clone())) {
            warn!(metric = metric_name, error = %e, "failed to register metric, skipping");
            return Family::Rejected;
        }

        debug!(metric = %exposed, "registered metric");
        self.owners.insert(exposed, metric_name.to_string());
        Family::Registered(gauge)
    }
}
