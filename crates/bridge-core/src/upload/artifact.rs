use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("artifact source not found: {0}")]
    Missing(PathBuf),

    #[error("failed to archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Handle to a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub name: String,
    pub location: String,
    pub files: usize,
}

/// Stores run artifacts (diagnostics, reports) somewhere durable.
pub trait ArtifactStore {
    fn upload(&self, name: &str, path: &Path) -> Result<ArtifactRef, UploadError>;
}

/// Copies artifacts under a local directory, one sub-directory per name.
///
/// CI systems pick the directory up with their own artifact step.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactStore {
    pub root: PathBuf,
}

impl DirectoryArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactStore for DirectoryArtifactStore {
    fn upload(&self, name: &str, path: &Path) -> Result<ArtifactRef, UploadError> {
        if !path.exists() {
            return Err(UploadError::Missing(path.to_path_buf()));
        }
        let dest = self.root.join(name);

        let mut files = 0;
        if path.is_file() {
            fs::create_dir_all(&dest).map_err(|source| UploadError::Io {
                path: dest.clone(),
                source,
            })?;
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            copy_file(path, &dest.join(file_name))?;
            files = 1;
        } else {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|source| UploadError::Walk {
                    path: path.to_path_buf(),
                    source,
                })?;
                let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
                let target = dest.join(relative);
                if entry.file_type().is_dir() {
                    fs::create_dir_all(&target).map_err(|source| UploadError::Io {
                        path: target.clone(),
                        source,
                    })?;
                } else {
                    copy_file(entry.path(), &target)?;
                    files += 1;
                }
            }
        }

        Ok(ArtifactRef {
            name: name.to_string(),
            location: dest.display().to_string(),
            files,
        })
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), UploadError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|source| UploadError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(from, to).map_err(|source| UploadError::Io {
        path: from.to_path_buf(),
        source,
    })?;
    Ok(())
}
