//! Shared application state.

use std::sync::Arc;

use ethtool_exporter_core::exporter::Exporter;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) exporter: Arc<Exporter>,
    /// Path the metrics are served under, linked from the landing page.
    pub(crate) telemetry_path: Arc<str>,
}

impl AppState {
    pub(crate) fn new(exporter: Exporter, telemetry_path: &str) -> Self {
        Self {
            exporter: Arc::new(exporter),
            telemetry_path: Arc::from(telemetry_path),
        }
    }
}
