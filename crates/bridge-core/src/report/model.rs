use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::acquire::decision::AcquisitionDecision;
use crate::exit::classify::ExitOutcome;
use crate::invoke::command::BridgeCommand;
use crate::upload::artifact::ArtifactRef;

/// Top-level invocation report.
///
/// One report per run; the layout is versioned by [`SCHEMA_VERSION`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub acquisition: AcquisitionInfo,
    pub command: BridgeCommand,
    pub outcome: ExitOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sarif: Option<SarifInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ArtifactRef>,
}

impl InvocationReport {
    pub fn new(
        tool: ToolInfo,
        acquisition: AcquisitionInfo,
        command: BridgeCommand,
        outcome: ExitOutcome,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            acquisition,
            command,
            outcome,
            sarif: None,
            diagnostics: None,
        }
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// What the resolver decided and what ended up on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionInfo {
    pub decision: AcquisitionDecision,
    pub install_root: String,
    pub bridge_path: String,
    /// Version from the installation manifest, when one exists.
    pub bridge_version: Option<String>,
    /// SHA-256 of the downloaded archive; absent when the cache was reused.
    pub archive_sha256: Option<String>,
}

/// SARIF upload status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SarifInfo {
    Uploaded { path: String, id: String },
    Skipped { reason: String },
    Failed { path: String, error: String },
}
