use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::POLICY_VIOLATION_EXIT_CODE;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown build status mode `{0}` (expected success, failure or unstable)")]
pub struct UnknownBuildStatusMode(pub String);

/// How a non-zero Bridge exit should be reported to the CI host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatusMode {
    /// Never fail the build.
    Success,
    /// Fail on any non-zero exit.
    #[default]
    Failure,
    /// Policy violations do not fail the build; everything else does.
    Unstable,
}

impl std::fmt::Display for BuildStatusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
        })
    }
}

impl std::str::FromStr for BuildStatusMode {
    type Err = UnknownBuildStatusMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "unstable" => Ok(Self::Unstable),
            _ => Err(UnknownBuildStatusMode(s.to_string())),
        }
    }
}

/// Exit interpretation policy for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitPolicyConfig {
    pub build_status_mode: BuildStatusMode,
    pub policy_violation_exit_code: i32,
}

impl ExitPolicyConfig {
    pub fn new(build_status_mode: BuildStatusMode) -> Self {
        Self {
            build_status_mode,
            policy_violation_exit_code: POLICY_VIOLATION_EXIT_CODE,
        }
    }
}

impl Default for ExitPolicyConfig {
    fn default() -> Self {
        Self::new(BuildStatusMode::default())
    }
}
