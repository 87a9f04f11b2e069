pub mod acquire;
pub mod exit;
pub mod install;
pub mod invoke;
pub mod pipeline;
pub mod report;
pub mod upload;

pub use acquire::resolve::resolve;
pub use exit::classify::classify;
pub use pipeline::run;

pub const TOOL_NAME: &str = "bridge-runner";

/// JSON schema version of invocation reports.
/// This must be bumped only when the report layout changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Exit code the Bridge CLI uses to signal a policy-driven build break.
pub const POLICY_VIOLATION_EXIT_CODE: i32 = 8;
