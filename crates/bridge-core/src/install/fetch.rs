use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid download location `{0}`")]
    InvalidLocation(String),

    #[error("unsupported download scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("download from {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("i/o error while fetching {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
}

/// Retrieves a Bridge archive into a local file.
///
/// Implementations perform a single attempt; retries are not part of the
/// contract.
pub trait Fetcher {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), FetchError>;
}

/// Fetches from `file://` URLs and plain filesystem paths.
///
/// Useful for airgapped runners whose "custom URL" points at a mounted
/// mirror rather than an HTTP server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    /// Map a location to a local path, or `None` if it is a remote URL.
    pub fn local_path(location: &str) -> Result<Option<PathBuf>, FetchError> {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Some)
                .map_err(|()| FetchError::InvalidLocation(location.to_string())),
            // Single-letter schemes are Windows drive prefixes.
            Ok(url) if url.scheme().len() == 1 => Ok(Some(PathBuf::from(location))),
            Ok(_) => Ok(None),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Some(PathBuf::from(location))),
            Err(_) => Err(FetchError::InvalidLocation(location.to_string())),
        }
    }
}

impl Fetcher for LocalFetcher {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), FetchError> {
        let Some(source) = Self::local_path(location)? else {
            let scheme = location.split(':').next().unwrap_or_default();
            return Err(FetchError::UnsupportedScheme(scheme.to_string()));
        };
        fs::copy(&source, destination).map_err(|source_err| FetchError::Io {
            location: location.to_string(),
            source: source_err,
        })?;
        Ok(())
    }
}

/// Hex-encoded SHA-256 of a downloaded archive.
///
/// Depends only on the file bytes, so identical archives always produce the
/// same fingerprint in the invocation report.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to hash archive: {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}
