//! Serves collection cycles to concurrent scrapes.
//!
//! The `Exporter` owns the process-wide metrics registry and the observation
//! source. Every scrape takes the collection lock, runs one full cycle,
//! pushes the result into the registry and renders it, all before the lock
//! is released. Overlapping scrapes therefore queue instead of running
//! `ethtool` concurrently, and each response reflects exactly one cycle.

mod families;

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::collector::{ExpositionSet, ObservationSource};
use crate::{NAMESPACE, VERSION};

pub use families::{GaugeFamilies, sanitize_metric_name};

/// Value of the `collector` label on the scrape self-metrics.
const COLLECTOR_LABEL: &str = "ethtool";

/// Errors returned while rendering a scrape.
#[derive(Debug)]
pub enum ExportError {
    /// Registration or encoding failed inside the metrics library.
    Prometheus(prometheus::Error),
    /// The encoder produced invalid UTF-8.
    Encoding(std::string::FromUtf8Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Prometheus(e) => write!(f, "metrics error: {}", e),
            ExportError::Encoding(e) => write!(f, "encoding error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<prometheus::Error> for ExportError {
    fn from(e: prometheus::Error) -> Self {
        ExportError::Prometheus(e)
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        ExportError::Encoding(e)
    }
}

struct ExporterState {
    source: Box<dyn ObservationSource>,
    families: GaugeFamilies,
}

/// Marks one scrape request as in flight until dropped.
pub struct InFlight(IntGauge);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Process-wide exporter shared by all scrape handlers.
pub struct Exporter {
    state: Mutex<ExporterState>,
    registry: Registry,
    scrape_duration: GaugeVec,
    scrape_success: GaugeVec,
    requests: IntCounterVec,
    requests_in_flight: IntGauge,
}

impl Exporter {
    /// Creates the exporter with a fresh registry.
    ///
    /// Registers the scrape self-metrics, a `build_info` gauge and, on Linux,
    /// the process collector.
    pub fn new(source: impl ObservationSource + 'static) -> Result<Self, ExportError> {
        let registry = Registry::new();

        let scrape_duration = GaugeVec::new(
            Opts::new(
                format!("{NAMESPACE}_scrape_collector_duration_seconds"),
                "ethtool_exporter: Duration of collector scrape.",
            ),
            &["collector"],
        )?;
        let scrape_success = GaugeVec::new(
            Opts::new(
                format!("{NAMESPACE}_scrape_collector_success"),
                "ethtool_exporter: Whether a collector succeeded.",
            ),
            &["collector"],
        )?;
        let build_info = GaugeVec::new(
            Opts::new(
                format!("{NAMESPACE}_exporter_build_info"),
                "ethtool_exporter: Build information.",
            ),
            &["version"],
        )?;
        build_info.with_label_values(&[VERSION]).set(1.0);
        // Same names as Go's promhttp so existing dashboards keep working.
        let requests = IntCounterVec::new(
            Opts::new(
                "promhttp_metric_handler_requests_total",
                "Total number of scrapes by HTTP status code.",
            ),
            &["code"],
        )?;
        let requests_in_flight = IntGauge::new(
            "promhttp_metric_handler_requests_in_flight",
            "Current number of scrapes being served.",
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(scrape_success.clone()))?;
        registry.register(Box::new(build_info))?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(requests_in_flight.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            state: Mutex::new(ExporterState {
                source: Box::new(source),
                families: GaugeFamilies::new(registry.clone()),
            }),
            registry,
            scrape_duration,
            scrape_success,
            requests,
            requests_in_flight,
        })
    }

    /// The registry all metrics are exposed from.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Content type of [`Exporter::scrape`] output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Runs one collection cycle and publishes it to the registry.
    pub fn collect(&self) -> ExpositionSet {
        let mut state = self.lock();
        self.run_cycle(&mut state)
    }

    /// Runs one collection cycle and renders the registry in the text
    /// exposition format.
    pub fn scrape(&self) -> Result<String, ExportError> {
        let mut state = self.lock();
        self.run_cycle(&mut state);

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Counts a scrape request as in flight for the lifetime of the guard.
    pub fn begin_request(&self) -> InFlight {
        self.requests_in_flight.inc();
        InFlight(self.requests_in_flight.clone())
    }

    /// Counts a finished scrape request by its HTTP status code.
    ///
    /// Called after the response is rendered, so a scrape never includes
    /// itself.
    pub fn record_response(&self, code: u16) {
        self.requests
            .with_label_values(&[code.to_string().as_str()])
            .inc();
    }

    fn lock(&self) -> MutexGuard<'_, ExporterState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("previous collection panicked, recovering collection lock");
            poisoned.into_inner()
        })
    }

    fn run_cycle(&self, state: &mut ExporterState) -> ExpositionSet {
        let set = state.source.collect();
        state.families.apply(&set);

        if let Some(stats) = state.source.last_cycle() {
            self.scrape_duration
                .with_label_values(&[COLLECTOR_LABEL])
                .set(stats.duration.as_secs_f64());
            self.scrape_success
                .with_label_values(&[COLLECTOR_LABEL])
                .set(if stats.enumeration_ok { 1.0 } else { 0.0 });
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::collector::mock::scenarios::{self, ETHTOOL_PATH, I40E_STATS, NET_PATH};
    use crate::collector::mock::{MockFs, MockRunner};
    use std::sync::Arc;
    use std::time::Duration;

    fn exporter_for(fs: MockFs, runner: MockRunner) -> Exporter {
        Exporter::new(Collector::new(fs, runner, ETHTOOL_PATH).with_net_path(NET_PATH)).unwrap()
    }

    #[test]
    fn test_scrape_renders_interface_metrics() {
        let (fs, runner) = scenarios::typical_host();
        let exporter = exporter_for(fs, runner);

        let body = exporter.scrape().unwrap();
        assert!(body.contains("# TYPE ethtool_rx_errors gauge"));
        assert!(body.contains("ethtool_rx_errors{interface=\"eth0\"} 42"));
        assert!(body.contains("ethtool_tx_queue_0_packets{interface=\"eth1\"} 4096"));
        assert!(!body.contains("interface=\"lo\""));
        assert!(body.contains("ethtool_scrape_collector_success{collector=\"ethtool\"} 1"));
        assert!(body.contains("ethtool_scrape_collector_duration_seconds{collector=\"ethtool\"}"));
        assert!(body.contains("ethtool_exporter_build_info{version="));
    }

    #[test]
    fn test_recurring_name_has_one_family() {
        let (fs, runner) = scenarios::typical_host();
        let exporter = exporter_for(fs, runner);
        let body = exporter.scrape().unwrap();

        // eth0 and eth1 both report tx_queue_0_packets.
        assert_eq!(body.matches("# TYPE ethtool_tx_queue_0_packets gauge").count(), 1);
        assert_eq!(body.matches("ethtool_tx_queue_0_packets{").count(), 2);

        // And the second scrape does not declare it again.
        let body = exporter.scrape().unwrap();
        assert_eq!(body.matches("# TYPE ethtool_tx_queue_0_packets gauge").count(), 1);
    }

    #[test]
    fn test_enumeration_failure_still_renders() {
        let (fs, runner) = scenarios::host_without_sysfs();
        let exporter = exporter_for(fs, runner);

        let body = exporter.scrape().unwrap();
        assert!(body.contains("ethtool_scrape_collector_success{collector=\"ethtool\"} 0"));
        assert!(!body.contains("interface="));
    }

    #[test]
    fn test_collect_returns_exposition_set() {
        let (fs, runner) = scenarios::typical_host();
        let exporter = exporter_for(fs, runner);

        let set = exporter.collect();
        assert_eq!(set.get("ethtool_rx_errors", "eth0"), Some(42.0));
        let families = exporter.registry().gather();
        assert!(families.iter().any(|mf| mf.get_name() == "ethtool_rx_errors"));
    }

    #[test]
    fn test_dotted_labels_are_sanitized() {
        let mut fs = MockFs::new();
        fs.add_interface(NET_PATH, "enp1s0f0", false);
        let runner = MockRunner::new().with_stats("enp1s0f0", I40E_STATS);
        let exporter = exporter_for(fs, runner);

        let body = exporter.scrape().unwrap();
        assert!(body.contains("ethtool_port_rx_bytes{interface=\"enp1s0f0\"} 3581203"));
        assert!(body.contains("ethtool_rx_packets{interface=\"enp1s0f0\"} 7612"));
    }

    #[test]
    fn test_request_accounting() {
        let (fs, runner) = scenarios::typical_host();
        let exporter = exporter_for(fs, runner);

        let guard = exporter.begin_request();
        let body = exporter.scrape().unwrap();
        assert!(body.contains("promhttp_metric_handler_requests_in_flight 1"));
        exporter.record_response(200);
        drop(guard);

        exporter.record_response(200);
        exporter.record_response(500);
        let body = exporter.scrape().unwrap();
        assert!(body.contains("promhttp_metric_handler_requests_in_flight 0"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"200\"} 2"));
        assert!(body.contains("promhttp_metric_handler_requests_total{code=\"500\"} 1"));
    }

    #[test]
    fn test_concurrent_scrapes_are_serialized() {
        let (fs, runner) = scenarios::typical_host();
        let runner = runner.with_delay(Duration::from_millis(20));
        let exporter = Arc::new(exporter_for(fs, runner.clone()));

        let barrier = Arc::new(std::sync::Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let exporter = exporter.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    exporter.scrape().unwrap()
                })
            })
            .collect();

        for h in handles {
            let body = h.join().unwrap();
            assert!(body.contains("ethtool_rx_errors{interface=\"eth0\"} 42"));
        }
        // Four interfaces per cycle, four cycles, never two at once.
        assert_eq!(runner.calls(), 16);
        assert_eq!(runner.max_in_flight(), 1);
    }
}
