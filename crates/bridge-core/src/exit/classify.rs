//! Exit policy classifier.
//!
//! Interprets the Bridge CLI's process exit code under the configured
//! build-status mode.
//!
//! Responsibilities:
//! - Flag policy violations (the configured sentinel exit code)
//! - Decide whether the invocation fails the build
//! - Produce a message that distinguishes success, non-failing violation,
//!   failing violation and unknown failure
//!
//! Non-responsibilities:
//! - Talking to the CI host (annotations, outputs)
//! - Altering the numeric exit code
//!
//! Rules, in order:
//!
//!   exit 0 or mode SUCCESS          → pass
//!   violation and mode UNSTABLE     → pass (unstable)
//!   violation                       → fail
//!   anything else                   → fail (unknown exit code)

use serde::{Deserialize, Serialize};

use crate::exit::policy::{BuildStatusMode, ExitPolicyConfig};

/// Exit code recorded when the Bridge process could not be started.
pub const SPAWN_FAILED_EXIT_CODE: i32 = -1;

/// Exit code recorded when the Bridge process was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    PolicyViolationNonFailing,
    PolicyViolationFailing,
    UnknownFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    /// Raw Bridge exit code, never rewritten by policy.
    pub reported_exit_code: i32,
    pub is_policy_violation: bool,
    pub treated_as_failure: bool,
    pub kind: OutcomeKind,
    pub message: String,
    /// Known meaning of the exit code, if any.
    pub detail: Option<String>,
}

/// Classify a Bridge exit code. Total over every `i32`.
pub fn classify(exit_code: i32, config: &ExitPolicyConfig) -> ExitOutcome {
    let is_policy_violation = exit_code == config.policy_violation_exit_code;

    let (kind, treated_as_failure, message) =
        if exit_code == 0 || config.build_status_mode == BuildStatusMode::Success {
            let message = if exit_code == 0 {
                "Bridge CLI execution completed successfully".to_string()
            } else {
                format!(
                    "Bridge CLI exited with code {exit_code}; build status is configured as SUCCESS"
                )
            };
            (OutcomeKind::Success, false, message)
        } else if is_policy_violation && config.build_status_mode == BuildStatusMode::Unstable {
            (
                OutcomeKind::PolicyViolationNonFailing,
                false,
                "Bridge CLI: policy violations detected, treated as unstable (non-failing)"
                    .to_string(),
            )
        } else if is_policy_violation {
            (
                OutcomeKind::PolicyViolationFailing,
                true,
                "Bridge CLI: policy violations detected, treated as failure".to_string(),
            )
        } else {
            (
                OutcomeKind::UnknownFailure,
                true,
                format!("Bridge CLI failed with unknown exit code: {exit_code}"),
            )
        };

    ExitOutcome {
        reported_exit_code: exit_code,
        is_policy_violation,
        treated_as_failure,
        kind,
        message,
        detail: describe_exit_code(exit_code).map(str::to_string),
    }
}

/// Documented meaning of Bridge CLI and runner exit codes.
pub fn describe_exit_code(exit_code: i32) -> Option<&'static str> {
    match exit_code {
        0 => Some("success"),
        1 => Some("undefined error, check the Bridge CLI logs"),
        2 => Some("error reported by a product adapter"),
        3 => Some("Bridge CLI failed to shut down cleanly"),
        8 => Some("build break requested because of policy violations"),
        9 => Some("Bridge CLI initialization failed"),
        SPAWN_FAILED_EXIT_CODE => Some("Bridge CLI process could not be started"),
        SIGNALLED_EXIT_CODE => Some("Bridge CLI process was terminated by a signal"),
        _ => None,
    }
}
