//! End-to-end invocation: probe → resolve → install → execute → classify.
//!
//! Every step runs strictly after the previous one. Collaborators that touch
//! the network or spawn processes are passed in, so the whole pipeline can be
//! driven with fakes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::acquire::decision::AcquisitionDecision;
use crate::acquire::repository::{ClientMode, Repository};
use crate::acquire::request::AcquisitionRequest;
use crate::acquire::resolve::resolve;
use crate::exit::classify::{SPAWN_FAILED_EXIT_CODE, classify};
use crate::exit::policy::ExitPolicyConfig;
use crate::install::extract::{InstallError, extract_archive};
use crate::install::fetch::{Fetcher, fingerprint};
use crate::install::layout::{CacheState, InstallLayout, read_version_manifest, write_version_manifest};
use crate::invoke::command::{BridgeCommand, CommandOptions, StageInput};
use crate::invoke::process::Executor;
use crate::report::model::{AcquisitionInfo, InvocationReport, ToolInfo};

/// Immutable configuration of one runner invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tool: ToolInfo,
    pub install_dir: PathBuf,
    /// Default repository; also fixes the host platform.
    pub repository: Repository,
    pub airgap: bool,
    pub thin_client: bool,
    pub custom_url: Option<String>,
    pub requested_version: Option<String>,
    pub workflow_version: Option<String>,
    pub stages: Vec<StageInput>,
    pub diagnostics: bool,
    pub disable_update: bool,
    pub policy: ExitPolicyConfig,
}

impl Invocation {
    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(
            &self.install_dir,
            self.repository.platform,
            ClientMode::from_thin_client(self.thin_client),
        )
    }

    pub fn acquisition_request(&self, cache: &CacheState) -> AcquisitionRequest {
        AcquisitionRequest {
            airgap_enabled: self.airgap,
            thin_client_enabled: self.thin_client,
            cached: cache.cached,
            cached_version: cache.cached_version.clone(),
            custom_url: self.custom_url.clone(),
            requested_version: self.requested_version.clone(),
            requested_workflow_version: self.workflow_version.clone(),
            repository: self.repository.clone(),
        }
    }

    pub fn command_options(&self, request: &AcquisitionRequest) -> CommandOptions {
        CommandOptions {
            stages: self.stages.clone(),
            diagnostics: self.diagnostics,
            thin_client: self.thin_client,
            workflow_version: request.workflow_version().map(str::to_string),
            disable_update: self.disable_update,
            airgap: request.airgap_enabled,
        }
    }
}

/// Run one invocation.
///
/// Returns an error only when the Bridge CLI cannot be made available or the
/// command cannot be built; both abort before anything is executed. A
/// resolver configuration error is returned as a
/// [`ConfigErrorKind`](crate::acquire::decision::ConfigErrorKind) inside the
/// `anyhow::Error`. Once execution is attempted a report is always produced,
/// even when the process could not be started.
pub fn run(
    invocation: &Invocation,
    fetcher: &dyn Fetcher,
    executor: &dyn Executor,
) -> Result<InvocationReport> {
    let layout = invocation.layout();
    let cache = layout.probe();
    let request = invocation.acquisition_request(&cache);

    let decision = resolve(&request);
    info!(
        decision = decision.label(),
        cached = cache.cached,
        cached_version = ?cache.cached_version,
        "resolved Bridge CLI acquisition"
    );
    if let AcquisitionDecision::Error { reason } = &decision {
        return Err(anyhow::Error::new(reason.clone()));
    }

    let command = BridgeCommand::build(&layout.binary_path(), &invocation.command_options(&request))?;

    let archive_sha256 = match decision.download_source() {
        Some(source) => Some(install(&layout, source, decision.expected_version(), fetcher)?),
        None => None,
    };

    let binary = layout.binary_path();
    if !binary.is_file() {
        return Err(InstallError::MissingBinary(binary).into());
    }
    let bridge_version =
        read_version_manifest(&layout.manifest_path(), layout.manifest_key()).unwrap_or_else(|e| {
            warn!(error = %e, "cannot read installed Bridge CLI version");
            None
        });

    info!(command = %command.display(), "executing Bridge CLI");
    let exit_code = match executor.execute(&command.program, &command.args) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Bridge CLI could not be started");
            SPAWN_FAILED_EXIT_CODE
        }
    };

    let outcome = classify(exit_code, &invocation.policy);
    info!(
        exit_code,
        failure = outcome.treated_as_failure,
        policy_violation = outcome.is_policy_violation,
        "{}",
        outcome.message
    );

    Ok(InvocationReport::new(
        invocation.tool.clone(),
        AcquisitionInfo {
            decision,
            install_root: layout.root().display().to_string(),
            bridge_path: binary.display().to_string(),
            bridge_version,
            archive_sha256,
        },
        command,
        outcome,
    ))
}

/// Download, fingerprint and extract one archive. Returns its SHA-256.
fn install(
    layout: &InstallLayout,
    source: &str,
    expected_version: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<String> {
    fs::create_dir_all(&layout.install_dir).with_context(|| {
        format!(
            "failed to create install directory: {}",
            layout.install_dir.display()
        )
    })?;
    let archive = layout.install_dir.join(format!(
        "{}.zip.part",
        layout
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    info!(source, "downloading Bridge CLI");
    let downloaded = fetcher
        .fetch(source, &archive)
        .with_context(|| format!("failed to download Bridge CLI from {source}"))
        .and_then(|()| fingerprint(&archive));
    let sha256 = match downloaded {
        Ok(sha256) => sha256,
        Err(e) => {
            discard_archive(&archive);
            return Err(e);
        }
    };
    info!(sha256 = %sha256, "downloaded Bridge CLI archive");

    let extracted = extract_archive(&archive, &layout.root(), layout.binary_name());
    discard_archive(&archive);
    extracted?;

    if let Some(version) = expected_version {
        let manifest = layout.manifest_path();
        if !manifest.exists() {
            write_version_manifest(&manifest, layout.manifest_key(), version)?;
        }
    }

    ensure_executable(&layout.binary_path())?;
    Ok(sha256)
}

fn discard_archive(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove downloaded archive"),
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let Ok(meta) = fs::metadata(path) else {
        return Ok(());
    };
    let mut perms = meta.permissions();
    if perms.mode() & 0o111 == 0 {
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)
            .with_context(|| format!("failed to mark {} executable", path.display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}
