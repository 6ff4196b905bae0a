//! Startup probing of the `ethtool` binary.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::traits::{CommandRunner, FileSystem};

/// Well-known install locations, probed in order.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "/usr/sbin/ethtool",
    "/sbin/ethtool",
    "/usr/bin/ethtool",
    "/bin/ethtool",
];

/// Oldest release whose `-S` output the parser understands.
pub const MIN_VERSION: EthtoolVersion = EthtoolVersion { major: 3, minor: 0 };

/// `major.minor` of an `ethtool` release. Patch levels are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EthtoolVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for EthtoolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Errors that prevent the exporter from starting.
#[derive(Debug)]
pub enum StartupError {
    /// None of the probed paths exists.
    EthtoolNotFound { searched: Vec<PathBuf> },
    /// `ethtool --version` could not be run or printed something unexpected.
    VersionCheck(String),
    /// The installed release is older than [`MIN_VERSION`].
    UnsupportedVersion {
        found: EthtoolVersion,
        required: EthtoolVersion,
    },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::EthtoolNotFound { searched } => {
                let paths: Vec<String> =
                    searched.iter().map(|p| p.display().to_string()).collect();
                write!(
                    f,
                    "could not find ethtool executable (searched {})",
                    paths.join(", ")
                )
            }
            StartupError::VersionCheck(msg) => write!(f, "ethtool version check failed: {}", msg),
            StartupError::UnsupportedVersion { found, required } => write!(
                f,
                "ethtool {} is not supported, {} or newer is required",
                found, required
            ),
        }
    }
}

impl std::error::Error for StartupError {}

/// Resolves the `ethtool` binary.
///
/// An explicit path must exist; otherwise [`DEFAULT_CANDIDATES`] are tried in
/// order and the first existing one wins.
pub fn locate_ethtool<F: FileSystem>(
    fs: &F,
    explicit: Option<&Path>,
) -> Result<PathBuf, StartupError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };

    for candidate in &candidates {
        if fs.exists(candidate) {
            debug!(path = %candidate.display(), "found ethtool");
            return Ok(candidate.clone());
        }
    }

    Err(StartupError::EthtoolNotFound {
        searched: candidates,
    })
}

/// Extracts the version from `ethtool --version` output
/// (`ethtool version 5.16`).
pub fn parse_version(output: &str) -> Option<EthtoolVersion> {
    let mut words = output.split_whitespace();
    words.find(|w| *w == "version")?;
    let number = words.next()?;

    let mut parts = number.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    Some(EthtoolVersion { major, minor })
}

/// Runs `ethtool --version` and rejects releases older than [`MIN_VERSION`].
pub fn check_version<R: CommandRunner>(
    runner: &R,
    ethtool: &Path,
) -> Result<EthtoolVersion, StartupError> {
    let out = runner.run(ethtool, &["--version"]).map_err(|e| {
        StartupError::VersionCheck(format!("cannot run {}: {}", ethtool.display(), e))
    })?;

    if !out.success {
        return Err(StartupError::VersionCheck(format!(
            "{} --version exited with {:?}: {}",
            ethtool.display(),
            out.code,
            out.stderr.trim()
        )));
    }

    let found = parse_version(&out.stdout).ok_or_else(|| {
        StartupError::VersionCheck(format!("unrecognized output {:?}", out.stdout.trim()))
    })?;

    if found < MIN_VERSION {
        return Err(StartupError::UnsupportedVersion {
            found,
            required: MIN_VERSION,
        });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};
    use crate::collector::traits::CommandOutput;

    #[test]
    fn test_locate_first_existing_candidate() {
        let mut fs = MockFs::new();
        fs.add_file("/sbin/ethtool");
        fs.add_file("/bin/ethtool");
        assert_eq!(
            locate_ethtool(&fs, None).unwrap(),
            PathBuf::from("/sbin/ethtool")
        );

        fs.add_file("/usr/sbin/ethtool");
        assert_eq!(
            locate_ethtool(&fs, None).unwrap(),
            PathBuf::from("/usr/sbin/ethtool")
        );
    }

    #[test]
    fn test_locate_not_found() {
        let err = locate_ethtool(&MockFs::new(), None).unwrap_err();
        match &err {
            StartupError::EthtoolNotFound { searched } => {
                assert_eq!(searched.len(), DEFAULT_CANDIDATES.len());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("/usr/sbin/ethtool"));
    }

    #[test]
    fn test_locate_explicit_path() {
        let mut fs = MockFs::new();
        fs.add_file("/usr/sbin/ethtool");
        fs.add_file("/opt/tools/ethtool");

        let found = locate_ethtool(&fs, Some(Path::new("/opt/tools/ethtool"))).unwrap();
        assert_eq!(found, PathBuf::from("/opt/tools/ethtool"));

        // An explicit path is never silently replaced by a probed one.
        assert!(locate_ethtool(&fs, Some(Path::new("/opt/missing/ethtool"))).is_err());
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(
            parse_version("ethtool version 5.16\n"),
            Some(EthtoolVersion { major: 5, minor: 16 })
        );
        assert_eq!(
            parse_version("ethtool version 4.8.1"),
            Some(EthtoolVersion { major: 4, minor: 8 })
        );
        assert_eq!(
            parse_version("ethtool version 6"),
            Some(EthtoolVersion { major: 6, minor: 0 })
        );
        assert_eq!(parse_version("ethtool: bad command line argument(s)"), None);
        assert_eq!(parse_version("ethtool version x.y"), None);
    }

    #[test]
    fn test_check_version_ok() {
        let runner = MockRunner::new().with_version("ethtool version 6.1\n");
        let v = check_version(&runner, Path::new("/usr/sbin/ethtool")).unwrap();
        assert_eq!(v.to_string(), "6.1");
    }

    #[test]
    fn test_check_version_too_old() {
        let runner = MockRunner::new().with_version("ethtool version 2.6.39\n");
        let err = check_version(&runner, Path::new("/usr/sbin/ethtool")).unwrap_err();
        assert!(matches!(
            err,
            StartupError::UnsupportedVersion {
                found: EthtoolVersion { major: 2, minor: 6 },
                ..
            }
        ));
    }

    #[test]
    fn test_check_version_failures() {
        let missing = MockRunner::new();
        assert!(matches!(
            check_version(&missing, Path::new("/usr/sbin/ethtool")),
            Err(StartupError::VersionCheck(_))
        ));

        let failing =
            MockRunner::new().with_response("--version", CommandOutput::failed(1, "boom"));
        assert!(matches!(
            check_version(&failing, Path::new("/usr/sbin/ethtool")),
            Err(StartupError::VersionCheck(_))
        ));

        let garbage = MockRunner::new().with_version("hello\n");
        assert!(matches!(
            check_version(&garbage, Path::new("/usr/sbin/ethtool")),
            Err(StartupError::VersionCheck(_))
        ));
    }
}
