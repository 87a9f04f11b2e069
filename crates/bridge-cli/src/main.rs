use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use bridge_core::acquire::repository::{Platform, Repository};
use bridge_core::exit::policy::ExitPolicyConfig;
use bridge_core::invoke::process::ProcessExecutor;
use bridge_core::pipeline::Invocation;
use bridge_core::report::model::{InvocationReport, SarifInfo, ToolInfo};
use bridge_core::report::render;
use bridge_core::upload::artifact::{ArtifactStore, DirectoryArtifactStore};
use bridge_core::upload::sarif::{SarifError, SarifUpload, SarifUploader};

use host::{Annotation, Host};
use http::{GithubSarifUploader, HttpFetcher};

mod args;
mod host;
mod http;
mod telemetry;

/// Directory the Bridge CLI writes its state and reports into.
const BRIDGE_STATE_DIR: &str = ".bridge";

fn main() -> Result<()> {
    let args = args::Args::parse();
    telemetry::init_tracing(args.log_json, args.log_level);

    let mut host = Host::from_env();
    match run(&args, &mut host) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            host.annotate(Annotation::Error, &format!("{e:#}"))?;
            Err(e)
        }
    }
}

fn run<W: Write>(args: &args::Args, host: &mut Host<W>) -> Result<i32> {
    let invocation = build_invocation(args)?;
    let fetcher = HttpFetcher::new()?;
    let executor = ProcessExecutor {
        working_dir: args.working_dir.clone(),
    };

    let mut report = bridge_core::run(&invocation, &fetcher, &executor)?;
    host.report_outcome(&report.outcome)?;

    if args.upload_sarif {
        let sarif = upload_sarif(args, &invocation);
        match &sarif {
            SarifInfo::Uploaded { id, .. } => info!(id = %id, "SARIF report uploaded"),
            SarifInfo::Skipped { reason } => {
                host.annotate(Annotation::Notice, &format!("SARIF upload skipped: {reason}"))?
            }
            SarifInfo::Failed { error, .. } => {
                host.annotate(Annotation::Warning, &format!("SARIF upload failed: {error}"))?
            }
        }
        report.sarif = Some(sarif);
    }

    if args.include_diagnostics {
        if let Some(dir) = &args.artifacts_dir {
            let state = working_path(args, Path::new(BRIDGE_STATE_DIR));
            match DirectoryArtifactStore::new(dir).upload("bridge-diagnostics", &state) {
                Ok(artifact) => report.diagnostics = Some(artifact),
                Err(e) => warn!(error = %e, "failed to archive Bridge diagnostics"),
            }
        }
    }

    write_report(args, &report)?;
    Ok(host::runner_exit_code(&report.outcome))
}

fn build_invocation(args: &args::Args) -> Result<Invocation> {
    let platform = match args.platform {
        Some(p) => p,
        None => Platform::detect()?,
    };
    let install_dir = match &args.install_dir {
        Some(dir) => dir.clone(),
        None => default_install_dir(),
    };

    Ok(Invocation {
        tool: ToolInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        install_dir,
        repository: Repository::new(args.repository_url.clone(), platform),
        airgap: args.network_airgap,
        thin_client: args.thin_client,
        custom_url: args.download_url.clone(),
        requested_version: args.download_version.clone(),
        workflow_version: args.workflow_version.clone(),
        stages: args.stages.clone(),
        diagnostics: args.include_diagnostics,
        disable_update: args.disable_update,
        policy: ExitPolicyConfig {
            build_status_mode: args.mark_build_status,
            policy_violation_exit_code: args.policy_violation_exit_code,
        },
    })
}

/// `$HOME/.blackduck/integrations`, or a relative directory without a home.
fn default_install_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".blackduck")
        .join("integrations")
}

fn working_path(args: &args::Args, path: &Path) -> PathBuf {
    match &args.working_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn upload_sarif(args: &args::Args, invocation: &Invocation) -> SarifInfo {
    let path = match &args.sarif_file {
        Some(p) => working_path(args, p),
        None => match invocation
            .stages
            .iter()
            .find_map(|s| s.product.default_sarif_path())
        {
            Some(p) => working_path(args, &p),
            None => {
                return SarifInfo::Skipped {
                    reason: "no configured stage produces a SARIF report".into(),
                };
            }
        },
    };

    let (Some(token), Some(repository), Some(sha), Some(git_ref)) = (
        args.github_token.as_deref(),
        args.github_repository.as_deref(),
        args.github_sha.as_deref(),
        args.github_ref.as_deref(),
    ) else {
        return SarifInfo::Skipped {
            reason: "GitHub token, repository, sha and ref are all required".into(),
        };
    };

    let display = path.display().to_string();
    let upload = match SarifUpload::from_file(&path, sha, git_ref) {
        Ok(u) => u,
        Err(SarifError::Missing(_)) => {
            return SarifInfo::Skipped {
                reason: format!("no SARIF report at {display}"),
            };
        }
        Err(e) => {
            return SarifInfo::Failed {
                path: display,
                error: e.to_string(),
            };
        }
    };

    let result = GithubSarifUploader::new(&args.github_api_url, repository, token)
        .and_then(|uploader| uploader.upload(&upload));
    match result {
        Ok(receipt) => SarifInfo::Uploaded {
            path: display,
            id: receipt.id,
        },
        Err(e) => SarifInfo::Failed {
            path: display,
            error: e.to_string(),
        },
    }
}

fn write_report(args: &args::Args, report: &InvocationReport) -> Result<()> {
    let output = match args.format {
        args::OutputFormat::Json => serde_json::to_string_pretty(report)?,
        args::OutputFormat::Text => render::render_text(report),
    };

    match &args.out {
        Some(path) => std::fs::write(path, &output)
            .with_context(|| format!("failed to write report: {}", path.display()))?,
        None => print!("{output}"),
    }
    Ok(())
}
