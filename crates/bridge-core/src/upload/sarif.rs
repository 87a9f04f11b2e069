//! SARIF report packaging for code-scanning ingestion.
//!
//! The code-scanning API accepts a SARIF log gzip-compressed and base64
//! encoded, bound to a commit and ref. This module only builds that payload;
//! sending it is an [`SarifUploader`]'s job.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SarifError {
    #[error("SARIF report not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read SARIF report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("SARIF report {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("SARIF report {0} has no `runs` array")]
    NoRuns(PathBuf),

    #[error("failed to compress SARIF report: {0}")]
    Compress(#[source] io::Error),

    #[error("SARIF upload rejected: {0}")]
    Rejected(String),
}

/// Request body for a code-scanning SARIF upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarifUpload {
    pub commit_sha: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// base64(gzip(report bytes))
    pub sarif: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Result of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SarifReceipt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Sends a prepared SARIF payload to a code-scanning service.
pub trait SarifUploader {
    fn upload(&self, upload: &SarifUpload) -> Result<SarifReceipt, SarifError>;
}

impl SarifUpload {
    /// Read, validate and encode the report at `path`.
    pub fn from_file(path: &Path, commit_sha: &str, git_ref: &str) -> Result<Self, SarifError> {
        if !path.is_file() {
            return Err(SarifError::Missing(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| SarifError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let log: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|source| SarifError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if !log.get("runs").is_some_and(serde_json::Value::is_array) {
            return Err(SarifError::NoRuns(path.to_path_buf()));
        }
        let tool_name = log
            .pointer("/runs/0/tool/driver/name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        Ok(Self {
            commit_sha: commit_sha.to_string(),
            git_ref: git_ref.to_string(),
            sarif: encode(&bytes)?,
            tool_name,
        })
    }
}

fn encode(bytes: &[u8]) -> Result<String, SarifError> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(bytes).map_err(SarifError::Compress)?;
    let compressed = gz.finish().map_err(SarifError::Compress)?;
    Ok(STANDARD.encode(compressed))
}
