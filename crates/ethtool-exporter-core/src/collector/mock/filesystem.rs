//! In-memory mock filesystem for testing collectors without real `/sys`.
//!
//! `MockFs` simulates files, directories and symbolic links in memory, so
//! enumeration can be tested on macOS and in CI containers.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Regular files. Contents are never read, only presence matters.
    files: HashSet<PathBuf>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from link path to link target.
    symlinks: HashMap<PathBuf, PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file. Parent directories are created.
    pub fn add_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path);
    }

    /// Adds an empty directory and its parents.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symbolic link at `path` pointing to `target`.
    ///
    /// The target is not created; call [`MockFs::add_dir`] for it if the
    /// link should resolve.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.symlinks.insert(path, target.as_ref().to_path_buf());
    }

    /// Adds a network interface entry under `net_path`.
    ///
    /// Physical NICs are modelled the way sysfs shows them: a symlink into
    /// `/sys/devices/<bus>/...`. Pass `virtual_device = true` for loopback,
    /// bridges and the like, which link into `/sys/devices/virtual/net`.
    pub fn add_interface(&mut self, net_path: impl AsRef<Path>, name: &str, virtual_device: bool) {
        let target = if virtual_device {
            PathBuf::from(format!("/sys/devices/virtual/net/{name}"))
        } else {
            PathBuf::from(format!("/sys/devices/pci0000:00/0000:00:03.0/net/{name}"))
        };
        self.add_file(target.join("mtu"));
        self.add_symlink(net_path.as_ref().join(name), target);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.symlinks
            .get(path)
            .cloned()
            .unwrap_or_else(|| path.to_path_buf())
    }
}

impl FileSystem for MockFs {
    fn exists(&self, path: &Path) -> bool {
        let path = self.resolve(path);
        self.files.contains(&path) || self.directories.contains(&path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let is_child = |p: &PathBuf| p.parent().is_some_and(|parent| parent == path) && p != path;

        let entries: HashSet<PathBuf> = self
            .files
            .iter()
            .chain(self.directories.iter())
            .chain(self.symlinks.keys())
            .filter(|p| is_child(p))
            .cloned()
            .collect();

        Ok(entries.into_iter().collect())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.symlinks.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {:?}", path),
            )
        })
    }
}
