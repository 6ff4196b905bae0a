//! Parser for `ethtool -S` output.
//!
//! ```text
//! NIC statistics:
//!      rx_packets: 1843512
//!      tx_packets: 1203344
//! ```
//!
//! Every data line is `<label>: <value>`. Malformed lines are skipped one by
//! one, so a single odd line never hides the rest of an interface's counters.

use tracing::warn;

/// Banner prefixes printed by `ethtool` before a block of counters.
const HEADER_PREFIXES: &[&str] = &["NIC statistics", "PHY statistics"];

/// Parse error for a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// One counter as printed by `ethtool`, label untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStat {
    pub label: String,
    pub value: f64,
}

/// Returns true for section banners such as `NIC statistics:`.
pub fn is_header(line: &str) -> bool {
    let line = line.trim_start();
    HEADER_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Parses one line of output.
///
/// Returns `Ok(None)` for blank lines and headers, `Ok(Some(_))` for a data
/// line and `Err` for anything else. The line is split on its first colon;
/// the label keeps its original spelling apart from surrounding whitespace.
pub fn parse_stat_line(line: &str) -> Result<Option<RawStat>, ParseError> {
    if line.trim().is_empty() || is_header(line) {
        return Ok(None);
    }

    let (label, value) = line
        .split_once(':')
        .ok_or_else(|| ParseError::new(format!("missing ':' in {:?}", line.trim())))?;

    let label = label.trim();
    if label.is_empty() {
        return Err(ParseError::new(format!("empty label in {:?}", line.trim())));
    }

    let value: f64 = value.trim().parse().map_err(|_| {
        ParseError::new(format!("invalid value for {:?}: {:?}", label, value.trim()))
    })?;

    Ok(Some(RawStat {
        label: label.to_string(),
        value,
    }))
}

/// Parses full `ethtool -S` output, logging and skipping malformed lines.
pub fn parse_stats(iface: &str, content: &str) -> Vec<RawStat> {
    let mut stats = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        match parse_stat_line(line) {
            Ok(Some(stat)) => stats.push(stat),
            Ok(None) => {}
            Err(e) => {
                warn!(interface = iface, line = idx + 1, error = %e, "skipping ethtool line");
            }
        }
    }
    stats
}
