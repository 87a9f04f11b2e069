use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("no Bridge stage configured; pass at least one --stage")]
    NoStages,

    #[error("unknown product `{0}` (expected polaris, blackducksca, coverity or srm)")]
    UnknownProduct(String),

    #[error("invalid stage `{0}`; expected <product>=<input file>")]
    InvalidStage(String),
}

/// Products the Bridge CLI can run as a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Polaris,
    BlackDuckSca,
    Coverity,
    Srm,
}

impl Product {
    pub fn stage_name(self) -> &'static str {
        match self {
            Self::Polaris => "polaris",
            Self::BlackDuckSca => "blackducksca",
            Self::Coverity => "connect",
            Self::Srm => "srm",
        }
    }

    /// Where the Bridge CLI writes this product's SARIF report, relative to
    /// the working directory. Only some products generate SARIF.
    pub fn default_sarif_path(self) -> Option<PathBuf> {
        let generator = match self {
            Self::Polaris => "Polaris SARIF Generator",
            Self::BlackDuckSca => "Blackduck SCA SARIF Generator",
            Self::Coverity | Self::Srm => return None,
        };
        Some(
            Path::new(".bridge")
                .join(generator)
                .join("report.sarif.json"),
        )
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stage_name())
    }
}

impl std::str::FromStr for Product {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polaris" => Ok(Self::Polaris),
            "blackducksca" | "blackduck" => Ok(Self::BlackDuckSca),
            "coverity" | "connect" => Ok(Self::Coverity),
            "srm" => Ok(Self::Srm),
            other => Err(CommandError::UnknownProduct(other.to_string())),
        }
    }
}

/// One `--stage` with the JSON input file the caller prepared for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInput {
    pub product: Product,
    pub input: PathBuf,
}

impl std::str::FromStr for StageInput {
    type Err = CommandError;

    /// Parses `product=path/to/input.json`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (product, input) = s
            .split_once('=')
            .ok_or_else(|| CommandError::InvalidStage(s.to_string()))?;
        if input.trim().is_empty() {
            return Err(CommandError::InvalidStage(s.to_string()));
        }
        Ok(Self {
            product: product.parse()?,
            input: PathBuf::from(input.trim()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub stages: Vec<StageInput>,
    pub diagnostics: bool,
    pub thin_client: bool,
    /// Pinned product workflow version; thin client only.
    pub workflow_version: Option<String>,
    /// Suppress the thin client's own workflow update step.
    pub disable_update: bool,
    /// The default repository must not be contacted, so never update.
    pub airgap: bool,
}

/// Fully built Bridge invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl BridgeCommand {
    pub fn build(program: &Path, options: &CommandOptions) -> Result<Self, CommandError> {
        if options.stages.is_empty() {
            return Err(CommandError::NoStages);
        }

        let workflow_version = options
            .workflow_version
            .as_deref()
            .map(str::trim)
            .filter(|v| options.thin_client && !v.is_empty());

        let mut args = Vec::with_capacity(options.stages.len() * 4 + 2);
        for stage in &options.stages {
            args.push("--stage".to_string());
            args.push(match workflow_version {
                Some(v) => format!("{}@{v}", stage.product.stage_name()),
                None => stage.product.stage_name().to_string(),
            });
            args.push("--input".to_string());
            args.push(stage.input.display().to_string());
        }

        if options.diagnostics {
            args.push("--diagnostics".to_string());
        }

        // A pinned workflow is exact by definition, so there is nothing to update.
        if options.thin_client
            && workflow_version.is_none()
            && !options.disable_update
            && !options.airgap
        {
            args.push("--update".to_string());
        }

        Ok(Self {
            program: program.to_path_buf(),
            args,
        })
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') {
                out.push('"');
                out.push_str(arg);
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}
