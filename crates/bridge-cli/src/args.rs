use std::path::PathBuf;

use bridge_core::acquire::repository::{DEFAULT_REPOSITORY_URL, Platform};
use bridge_core::exit::policy::BuildStatusMode;
use bridge_core::invoke::command::StageInput;
use clap::{ArgAction, Parser, ValueEnum};
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "bridge-runner",
    version,
    about = "Acquire, run and interpret the Bridge CLI in CI pipelines"
)]
pub struct Args {
    /// Stage to run, as <product>=<input json> (repeatable)
    #[arg(
        long = "stage",
        env = "BRIDGE_STAGES",
        value_delimiter = ',',
        required = true
    )]
    pub stages: Vec<StageInput>,

    /// Directory holding Bridge CLI installations
    #[arg(long, env = "BRIDGE_INSTALL_DIR")]
    pub install_dir: Option<PathBuf>,

    /// Custom archive URL; always preferred over the default repository
    #[arg(long, env = "BRIDGE_DOWNLOAD_URL")]
    pub download_url: Option<String>,

    /// Exact Bridge CLI version to use ("latest" means no pin)
    #[arg(long, env = "BRIDGE_DOWNLOAD_VERSION")]
    pub download_version: Option<String>,

    /// Default repository the archives are fetched from
    #[arg(long, env = "BRIDGE_REPOSITORY_URL", default_value = DEFAULT_REPOSITORY_URL)]
    pub repository_url: Url,

    /// Override host platform detection (linux64, linux_arm, macosx, macos_arm, win64)
    #[arg(long, env = "BRIDGE_PLATFORM")]
    pub platform: Option<Platform>,

    /// Never contact the default repository
    #[arg(long, env = "NETWORK_AIRGAP", action = ArgAction::Set, default_value_t = false)]
    pub network_airgap: bool,

    /// Use the thin client instead of the full bundle
    #[arg(long, env = "BRIDGE_THIN_CLIENT", action = ArgAction::Set, default_value_t = false)]
    pub thin_client: bool,

    /// Product workflow version for the thin client
    #[arg(long, env = "BRIDGE_WORKFLOW_VERSION")]
    pub workflow_version: Option<String>,

    /// Do not let the thin client update its workflows
    #[arg(long, env = "BRIDGE_DISABLE_UPDATE", action = ArgAction::Set, default_value_t = false)]
    pub disable_update: bool,

    /// Ask the Bridge CLI for diagnostics output
    #[arg(long, env = "INCLUDE_DIAGNOSTICS", action = ArgAction::Set, default_value_t = false)]
    pub include_diagnostics: bool,

    /// How a non-zero exit is reported to the CI host
    #[arg(long, env = "MARK_BUILD_STATUS", default_value = "failure")]
    pub mark_build_status: BuildStatusMode,

    /// Exit code the Bridge CLI uses for policy violations
    #[arg(long, default_value_t = bridge_core::POLICY_VIOLATION_EXIT_CODE, allow_negative_numbers = true)]
    pub policy_violation_exit_code: i32,

    /// Directory to run the Bridge CLI in
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub working_dir: Option<PathBuf>,

    /// Upload the SARIF report to code scanning after the run
    #[arg(long, env = "UPLOAD_SARIF", action = ArgAction::Set, default_value_t = false)]
    pub upload_sarif: bool,

    /// SARIF report to upload; defaults to the first stage's generator output
    #[arg(long, env = "BRIDGE_SARIF_FILE")]
    pub sarif_file: Option<PathBuf>,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// owner/name of the repository receiving the SARIF upload
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,

    #[arg(long, env = "GITHUB_SHA")]
    pub github_sha: Option<String>,

    #[arg(long, env = "GITHUB_REF")]
    pub github_ref: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: Url,

    /// Copy diagnostics into this directory after the run
    #[arg(long, env = "BRIDGE_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "BRIDGE_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
