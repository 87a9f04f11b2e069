use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::acquire::repository::{ClientMode, Platform};

/// Name of the version manifest shipped inside every installation root.
pub const VERSION_MANIFEST: &str = "versions.txt";

/// Where one Bridge installation lives on disk.
///
/// Bundle and thin-client installs get separate roots under the same
/// install directory so switching modes never clobbers the other cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub install_dir: PathBuf,
    pub platform: Platform,
    pub mode: ClientMode,
}

/// What the cache probe found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    pub cached: bool,
    pub cached_version: Option<String>,
}

impl InstallLayout {
    pub fn new(install_dir: impl Into<PathBuf>, platform: Platform, mode: ClientMode) -> Self {
        Self {
            install_dir: install_dir.into(),
            platform,
            mode,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.install_dir
            .join(format!("{}-{}", self.mode.artifact_stem(), self.platform))
    }

    pub fn binary_name(&self) -> &'static str {
        if self.platform.is_windows() {
            "bridge-cli.exe"
        } else {
            "bridge-cli"
        }
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root().join(self.binary_name())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root().join(VERSION_MANIFEST)
    }

    /// Manifest key carrying the installation's own version.
    pub fn manifest_key(&self) -> &'static str {
        self.mode.artifact_stem()
    }

    /// Inspect the installation root without modifying it.
    ///
    /// An unreadable manifest is not an error: the install is still usable,
    /// it just cannot satisfy an explicit version pin.
    pub fn probe(&self) -> CacheState {
        let binary = self.binary_path();
        if !binary.is_file() {
            debug!(path = %binary.display(), "no cached Bridge CLI");
            return CacheState::default();
        }

        let cached_version = match read_version_manifest(&self.manifest_path(), self.manifest_key())
        {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable version manifest");
                None
            }
        };

        debug!(path = %binary.display(), version = ?cached_version, "found cached Bridge CLI");
        CacheState {
            cached: true,
            cached_version,
        }
    }
}

/// Read `key` from a `key: value` manifest. A missing file yields `None`.
pub fn read_version_manifest(path: &Path, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read version manifest: {}", path.display()))?;
    Ok(parse_manifest(&text, key))
}

/// Write a single-entry manifest, replacing any existing one.
pub fn write_version_manifest(path: &Path, key: &str, version: &str) -> Result<()> {
    fs::write(path, format!("{key}: {version}\n"))
        .with_context(|| format!("failed to write version manifest: {}", path.display()))
}

fn parse_manifest(text: &str, key: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
