//! Metric name derivation from raw `ethtool` labels.

use crate::NAMESPACE;

/// Builds the metric name for a raw label.
///
/// The label is trimmed, every whitespace run becomes a single `_`, and the
/// result is prefixed with `ethtool_`. Nothing else is rewritten, so two
/// labels that differ in any other character stay distinct:
///
/// ```
/// use ethtool_exporter_core::collector::metric_name;
///
/// assert_eq!(metric_name("  rx_errors "), "ethtool_rx_errors");
/// assert_eq!(metric_name("rx missed\terrors"), "ethtool_rx_missed_errors");
/// assert_eq!(metric_name("port.rx_bytes"), "ethtool_port.rx_bytes");
/// ```
pub fn metric_name(label: &str) -> String {
    let mut name = String::with_capacity(NAMESPACE.len() + 1 + label.len());
    name.push_str(NAMESPACE);
    for word in label.split_whitespace() {
        name.push('_');
        name.push_str(word);
    }
    name
}
