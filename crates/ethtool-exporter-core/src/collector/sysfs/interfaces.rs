//! Lists network interfaces from the kernel's device registry.
//!
//! Every entry of `/sys/class/net` is an interface name. On a real system the
//! entries are symlinks into `/sys/devices`; virtual devices (loopback,
//! bridges, veth pairs, bonds) link into `/sys/devices/virtual/net`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::collector::traits::FileSystem;

/// Default location of the network device registry.
pub const DEFAULT_NET_PATH: &str = "/sys/class/net";

/// Marker in a symlink target that identifies a virtual device.
const VIRTUAL_DEVICE_MARKER: &str = "devices/virtual/";

/// A network interface found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// Target of the registry entry when it is a symlink.
    pub link_target: Option<PathBuf>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link_target: None,
        }
    }

    pub fn is_symlink(&self) -> bool {
        self.link_target.is_some()
    }

    /// Whether the entry points into `/sys/devices/virtual`.
    pub fn is_virtual(&self) -> bool {
        self.link_target
            .as_ref()
            .is_some_and(|t| t.to_string_lossy().contains(VIRTUAL_DEVICE_MARKER))
    }
}

/// Which registry entries are handed to the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterfaceFilter {
    /// Every entry, symlinks included.
    #[default]
    All,
    /// Drop entries that are symbolic links.
    SkipSymlinks,
    /// Drop entries that link into `/sys/devices/virtual`.
    SkipVirtual,
}

impl InterfaceFilter {
    fn accepts(self, iface: &Interface) -> bool {
        match self {
            InterfaceFilter::All => true,
            InterfaceFilter::SkipSymlinks => !iface.is_symlink(),
            InterfaceFilter::SkipVirtual => !iface.is_virtual(),
        }
    }
}

impl FromStr for InterfaceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(InterfaceFilter::All),
            "skip-symlinks" => Ok(InterfaceFilter::SkipSymlinks),
            "skip-virtual" => Ok(InterfaceFilter::SkipVirtual),
            other => Err(format!(
                "unknown interface filter '{}' (expected all, skip-symlinks or skip-virtual)",
                other
            )),
        }
    }
}

impl fmt::Display for InterfaceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceFilter::All => "all",
            InterfaceFilter::SkipSymlinks => "skip-symlinks",
            InterfaceFilter::SkipVirtual => "skip-virtual",
        };
        f.write_str(s)
    }
}

/// The device registry directory could not be read.
#[derive(Debug)]
pub struct EnumerationError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for EnumerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot list interfaces in {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for EnumerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Reads interface names from the device registry.
pub struct InterfaceEnumerator<F: FileSystem> {
    fs: F,
    net_path: PathBuf,
    filter: InterfaceFilter,
}

impl<F: FileSystem> InterfaceEnumerator<F> {
    /// Creates an enumerator over `net_path` (usually `/sys/class/net`).
    pub fn new(fs: F, net_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            net_path: net_path.into(),
            filter: InterfaceFilter::All,
        }
    }

    pub fn with_net_path(mut self, net_path: impl Into<PathBuf>) -> Self {
        self.net_path = net_path.into();
        self
    }

    pub fn with_filter(mut self, filter: InterfaceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn filter(&self) -> InterfaceFilter {
        self.filter
    }

    pub fn net_path(&self) -> &Path {
        &self.net_path
    }

    /// Lists interfaces in directory order.
    ///
    /// Fails only if the registry directory itself cannot be read; there is
    /// no partial result.
    pub fn list_interfaces(&self) -> Result<Vec<Interface>, EnumerationError> {
        let entries = self
            .fs
            .read_dir(&self.net_path)
            .map_err(|source| EnumerationError {
                path: self.net_path.clone(),
                source,
            })?;

        let mut interfaces = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                debug!(entry = %entry.display(), "skipping non UTF-8 interface name");
                continue;
            };
            let iface = Interface {
                name: name.to_string(),
                link_target: self.fs.read_link(&entry).ok(),
            };
            if self.filter.accepts(&iface) {
                interfaces.push(iface);
            } else {
                debug!(interface = %iface.name, filter = %self.filter, "interface filtered out");
            }
        }
        Ok(interfaces)
    }
}
