use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default remote repository hosting Bridge CLI archives.
pub const DEFAULT_REPOSITORY_URL: &str =
    "https://repo.blackduck.com/bds-integrations-release/com/blackduck/integration/bridge/binaries/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unsupported host platform: {os}/{arch}")]
    Unsupported { os: String, arch: String },

    #[error("unknown platform name: {0}")]
    UnknownName(String),
}

/// Host platform tag as it appears in Bridge archive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux64,
    LinuxArm,
    Macosx,
    MacosArm,
    Win64,
}

impl Platform {
    /// Detect the platform of the running host.
    pub fn detect() -> Result<Self, PlatformError> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_os_arch(os: &str, arch: &str) -> Result<Self, PlatformError> {
        match (os, arch) {
            ("linux", "x86_64") => Ok(Self::Linux64),
            ("linux", "aarch64") => Ok(Self::LinuxArm),
            ("macos", "x86_64") => Ok(Self::Macosx),
            ("macos", "aarch64") => Ok(Self::MacosArm),
            ("windows", "x86_64") => Ok(Self::Win64),
            _ => Err(PlatformError::Unsupported {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux64 => "linux64",
            Self::LinuxArm => "linux_arm",
            Self::Macosx => "macosx",
            Self::MacosArm => "macos_arm",
            Self::Win64 => "win64",
        }
    }

    pub fn is_windows(self) -> bool {
        self == Self::Win64
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux64" => Ok(Self::Linux64),
            "linux_arm" => Ok(Self::LinuxArm),
            "macosx" => Ok(Self::Macosx),
            "macos_arm" => Ok(Self::MacosArm),
            "win64" => Ok(Self::Win64),
            other => Err(PlatformError::UnknownName(other.to_string())),
        }
    }
}

/// Which flavour of Bridge installation is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMode {
    /// Full bundle with every product adapter shipped in the archive.
    Bundle,
    /// Lightweight client that pulls product workflows at runtime.
    ThinClient,
}

impl ClientMode {
    pub fn from_thin_client(enabled: bool) -> Self {
        if enabled { Self::ThinClient } else { Self::Bundle }
    }

    /// Directory segment in the remote repository.
    fn repository_dir(self) -> &'static str {
        match self {
            Self::Bundle => "bridge-cli-bundle",
            Self::ThinClient => "bridge-cli-thin-client",
        }
    }

    /// Archive and installation-root stem, without version or platform.
    pub fn artifact_stem(self) -> &'static str {
        match self {
            Self::Bundle => "bridge-cli-bundle",
            Self::ThinClient => "bridge-cli",
        }
    }
}

/// Default download repository for one host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub base: Url,
    pub platform: Platform,
}

impl Repository {
    pub fn new(mut base: Url, platform: Platform) -> Self {
        // `Url::join` drops the last segment of a base without a trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, platform }
    }

    /// Repository rooted at [`DEFAULT_REPOSITORY_URL`].
    pub fn default_for(platform: Platform) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(DEFAULT_REPOSITORY_URL)?, platform))
    }

    /// Archive URL for the most recent release.
    pub fn latest_url(&self, mode: ClientMode) -> Result<Url, url::ParseError> {
        self.base.join(&format!(
            "{}/latest/{}-{}.zip",
            mode.repository_dir(),
            mode.artifact_stem(),
            self.platform
        ))
    }

    /// Archive URL for an exact release.
    pub fn version_url(&self, mode: ClientMode, version: &str) -> Result<Url, url::ParseError> {
        self.base.join(&format!(
            "{}/{version}/{}-{version}-{}.zip",
            mode.repository_dir(),
            mode.artifact_stem(),
            self.platform
        ))
    }
}
