use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to open Bridge archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid Bridge archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry escapes the installation root: {0}")]
    UnsafeEntry(String),

    #[error("i/o error while installing into {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Bridge CLI binary not found at {0} after installation")]
    MissingBinary(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> InstallError + '_ {
    move |source| InstallError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Extract a Bridge zip archive into a fresh installation root.
///
/// Entries are written into a sibling `{root}.partial` directory first. Only
/// when every entry was written and `binary_name` is present does the staged
/// tree replace `root`; on any error the staging directory is removed and the
/// previous installation is left as it was. When every entry shares one
/// top-level directory (the usual `bridge-cli-bundle-linux64/` wrapper) that
/// directory is stripped so the binary lands directly in `root`.
///
/// Returns the number of files written.
pub fn extract_archive(
    archive_path: &Path,
    root: &Path,
    binary_name: &str,
) -> Result<usize, InstallError> {
    let staging = staging_dir(root);
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
    }

    let written = match extract_into(archive_path, &staging).and_then(|written| {
        if staging.join(binary_name).is_file() {
            Ok(written)
        } else {
            Err(InstallError::MissingBinary(root.join(binary_name)))
        }
    }) {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %staging.display(), error = %cleanup, "failed to remove staging directory");
                }
            }
            return Err(e);
        }
    };

    if root.exists() {
        debug!(root = %root.display(), "removing previous installation");
        fs::remove_dir_all(root).map_err(io_err(root))?;
    }
    fs::rename(&staging, root).map_err(io_err(root))?;

    info!(root = %root.display(), files = written, "extracted Bridge archive");
    Ok(written)
}

fn staging_dir(root: &Path) -> PathBuf {
    let mut name = root.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    root.with_file_name(name)
}

fn extract_into(archive_path: &Path, dest: &Path) -> Result<usize, InstallError> {
    let file = fs::File::open(archive_path).map_err(|source| InstallError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| InstallError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|source| InstallError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let name = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| InstallError::UnsafeEntry(entry.name().to_string()))?;
        entries.push(name);
    }
    let prefix = common_top_level_dir(&entries);

    fs::create_dir_all(dest).map_err(io_err(dest))?;

    let mut written = 0;
    for (i, name) in entries.iter().enumerate() {
        let relative = match &prefix {
            Some(p) => name.strip_prefix(p).unwrap_or(name.as_path()),
            None => name.as_path(),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);

        let mut entry = archive.by_index(i).map_err(|source| InstallError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(io_err(&target))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut out = fs::File::create(&target).map_err(io_err(&target))?;
        io::copy(&mut entry, &mut out).map_err(io_err(&target))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(io_err(&target))?;
        }

        written += 1;
    }
    Ok(written)
}

/// The single directory every entry lives under, if there is one.
fn common_top_level_dir(entries: &[PathBuf]) -> Option<PathBuf> {
    let mut common: Option<&Path> = None;
    for entry in entries {
        let mut components = entry.components();
        let first = match components.next() {
            Some(Component::Normal(c)) => Path::new(c),
            _ => return None,
        };
        // A file sitting at the top level means there is no wrapper directory.
        if components.next().is_none() && !entry_is_dir_marker(entry, entries) {
            return None;
        }
        match common {
            None => common = Some(first),
            Some(c) if c == first => {}
            Some(_) => return None,
        }
    }
    common.map(Path::to_path_buf)
}

/// True when `entry` is itself the prefix of some other entry.
fn entry_is_dir_marker(entry: &Path, entries: &[PathBuf]) -> bool {
    entries.iter().any(|e| e != entry && e.starts_with(entry))
}
