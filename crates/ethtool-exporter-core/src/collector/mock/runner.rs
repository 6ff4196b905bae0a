//! Scripted command runner for testing without a real `ethtool`.
//!
//! Responses are keyed by the space-joined argument list (`"-S eth0"`,
//! `"--version"`). Unscripted invocations fail to launch with
//! `io::ErrorKind::NotFound`, like a missing binary.
//!
//! The runner also records how many invocations happened and how many were
//! in flight at the same time, so serialization can be asserted from tests.

use crate::collector::traits::{CommandOutput, CommandRunner};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_args: Mutex<HashMap<String, usize>>,
}

/// Mock implementation of [`CommandRunner`].
///
/// Clones share their counters, so a clone handed to a collector can be
/// inspected through the original.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    responses: HashMap<String, CommandOutput>,
    delay: Option<Duration>,
    counters: Arc<Counters>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful run of `ethtool -S <iface>`.
    pub fn with_stats(self, iface: &str, stdout: impl Into<String>) -> Self {
        self.with_response(&format!("-S {iface}"), CommandOutput::ok(stdout))
    }

    /// Scripts a failing run of `ethtool -S <iface>`.
    pub fn with_stats_failure(self, iface: &str, code: i32, stderr: &str) -> Self {
        self.with_response(&format!("-S {iface}"), CommandOutput::failed(code, stderr))
    }

    /// Scripts the output of `ethtool --version`.
    pub fn with_version(self, stdout: impl Into<String>) -> Self {
        self.with_response("--version", CommandOutput::ok(stdout))
    }

    /// Scripts an arbitrary response for the given argument string.
    pub fn with_response(mut self, args: &str, output: CommandOutput) -> Self {
        self.responses.insert(args.to_string(), output);
        self
    }

    /// Makes every invocation sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of invocations.
    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    /// Number of invocations with the given argument string.
    pub fn calls_with(&self, args: &str) -> usize {
        let per_args = self
            .counters
            .per_args
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        per_args.get(args).copied().unwrap_or(0)
    }

    /// Highest number of invocations observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, _program: &Path, args: &[&str]) -> io::Result<CommandOutput> {
        let key = args.join(" ");
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut per_args = self
                .counters
                .per_args
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *per_args.entry(key.clone()).or_insert(0) += 1;
        }

        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.responses.get(&key).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted response for {:?}", key),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_scripted_responses() {
        let runner = MockRunner::new()
            .with_stats("eth0", "NIC statistics:\n     rx_packets: 1\n")
            .with_stats_failure("lo", 94, "Operation not supported\n");

        let ok = runner.run(Path::new("ethtool"), &["-S", "eth0"]).unwrap();
        assert!(ok.success);
        assert!(ok.stdout.contains("rx_packets"));

        let failed = runner.run(Path::new("ethtool"), &["-S", "lo"]).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.code, Some(94));

        let missing = runner.run(Path::new("ethtool"), &["-S", "wlan0"]).unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);

        assert_eq!(runner.calls(), 3);
        assert_eq!(runner.calls_with("-S eth0"), 1);
        assert_eq!(runner.max_in_flight(), 1);
    }

    #[test]
    fn test_mock_runner_clones_share_counters() {
        let runner = MockRunner::new().with_version("ethtool version 6.1\n");
        let clone = runner.clone();
        clone.run(Path::new("ethtool"), &["--version"]).unwrap();
        assert_eq!(runner.calls_with("--version"), 1);
    }

    #[test]
    fn test_mock_runner_tracks_overlap() {
        let runner = MockRunner::new()
            .with_stats("eth0", "")
            .with_delay(Duration::from_millis(100));
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let r = runner.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    r.run(Path::new("ethtool"), &["-S", "eth0"])
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(runner.calls(), 2);
        assert_eq!(runner.max_in_flight(), 2);
    }
}
