use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Configuration problems that make acquisition impossible.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConfigErrorKind {
    #[error(
        "network airgap is enabled but no cached Bridge CLI matches and no custom download URL was provided"
    )]
    AirgapBinaryUnavailable,

    #[error("cannot build a download URL from the configured repository: {0}")]
    InvalidDownloadSource(String),
}

/// Outcome of [`resolve`](crate::acquire::resolve::resolve).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AcquisitionDecision {
    /// Use the cached binary as-is.
    Skip,
    DownloadLatest {
        source: Url,
    },
    DownloadVersion {
        version: String,
        source: Url,
    },
    /// `version` is the explicit pin, if any; otherwise the URL is assumed
    /// to encode the desired release.
    DownloadFromCustomUrl {
        url: String,
        version: Option<String>,
    },
    Error {
        reason: ConfigErrorKind,
    },
}

impl AcquisitionDecision {
    /// Location to download from, if the decision requires a download.
    pub fn download_source(&self) -> Option<&str> {
        match self {
            Self::DownloadLatest { source } | Self::DownloadVersion { source, .. } => {
                Some(source.as_str())
            }
            Self::DownloadFromCustomUrl { url, .. } => Some(url.as_str()),
            Self::Skip | Self::Error { .. } => None,
        }
    }

    /// Version the downloaded archive is expected to contain, when known.
    pub fn expected_version(&self) -> Option<&str> {
        match self {
            Self::DownloadVersion { version, .. } => Some(version),
            Self::DownloadFromCustomUrl { version, .. } => version.as_deref(),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::DownloadLatest { .. } => "download_latest",
            Self::DownloadVersion { .. } => "download_version",
            Self::DownloadFromCustomUrl { .. } => "download_from_custom_url",
            Self::Error { .. } => "error",
        }
    }
}
