//! Fixture hosts for tests and non-Linux development runs.
//!
//! Outputs are trimmed copies of what real drivers print for `ethtool -S`.

use super::{MockFs, MockRunner};

/// Where the fixture hosts have `ethtool` installed.
pub const ETHTOOL_PATH: &str = "/usr/sbin/ethtool";

/// Device registry directory used by the fixtures.
pub const NET_PATH: &str = "/sys/class/net";

/// `ethtool --version` output of the fixture binary.
pub const VERSION_OUTPUT: &str = "ethtool version 6.1\n";

/// Intel ixgbe output.
pub const IXGBE_STATS: &str = "\
NIC statistics:
     rx_packets: 1843512
     tx_packets: 1203344
     rx_bytes: 2290837491
     tx_bytes: 158391023
     rx_errors: 42
     tx_errors: 0
     rx_dropped: 0
     tx_dropped: 0
     multicast: 1203
     collisions: 0
     rx_over_errors: 0
     rx_crc_errors: 0
     fdir_miss: 2046
     tx_queue_0_packets: 601672
     tx_queue_0_bytes: 79195511
     rx_queue_0_packets: 921756
     rx_queue_0_bytes: 1145418745
";

/// Intel i40e output. Port counters carry a `port.` prefix.
pub const I40E_STATS: &str = "\
NIC statistics:
     rx_packets: 7612
     tx_packets: 6110
     port.rx_bytes: 3581203
     port.tx_bytes: 1092871
     port.rx_dropped: 0
";

/// virtio_net output.
pub const VIRTIO_STATS: &str = "\
NIC statistics:
     rx_queue_0_packets: 5120
     rx_queue_0_bytes: 7340032
     rx_queue_0_drops: 0
     rx_queue_0_xdp_packets: 0
     tx_queue_0_packets: 4096
     tx_queue_0_bytes: 393216
     tx_queue_0_kicks: 2048
";

/// Output with malformed lines mixed in.
pub const NOISY_STATS: &str = "\
NIC statistics:
     rx_packets: 10
     driver info: xyz
     this line has no colon
     tx_packets: 20
     : 5
     rx missed errors: 3
";

/// A host with two physical NICs, a loopback and a docker bridge.
///
/// `eth0` and `eth1` report statistics; `lo` and `docker0` make `ethtool`
/// fail the way it does for devices without driver statistics.
pub fn typical_host() -> (MockFs, MockRunner) {
    let mut fs = MockFs::new();
    fs.add_file(ETHTOOL_PATH);
    for (name, virtual_device) in [
        ("eth0", false),
        ("eth1", false),
        ("lo", true),
        ("docker0", true),
    ] {
        fs.add_interface(NET_PATH, name, virtual_device);
    }

    let runner = MockRunner::new()
        .with_version(VERSION_OUTPUT)
        .with_stats("eth0", IXGBE_STATS)
        .with_stats("eth1", VIRTIO_STATS)
        .with_stats_failure("lo", 94, "no stats available\n")
        .with_stats_failure("docker0", 94, "no stats available\n");

    (fs, runner)
}

/// A host whose device registry directory is missing.
pub fn host_without_sysfs() -> (MockFs, MockRunner) {
    let mut fs = MockFs::new();
    fs.add_file(ETHTOOL_PATH);
    let runner = MockRunner::new().with_version(VERSION_OUTPUT);
    (fs, runner)
}
