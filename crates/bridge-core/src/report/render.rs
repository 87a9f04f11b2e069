use crate::TOOL_NAME;
use crate::report::model::{InvocationReport, SarifInfo};

pub fn render_text(report: &InvocationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, report.tool.version));
    out.push_str(&format!(
        "Acquisition: {}\n",
        report.acquisition.decision.label()
    ));
    out.push_str(&format!(
        "Bridge CLI: {} ({})\n",
        report.acquisition.bridge_path,
        report
            .acquisition
            .bridge_version
            .as_deref()
            .unwrap_or("unknown version")
    ));
    out.push_str(&format!("Command: {}\n", report.command.display()));
    out.push_str(&format!("Exit code: {}\n", report.outcome.reported_exit_code));
    out.push_str(&format!("Status: {}\n", report.outcome.message));
    if let Some(sarif) = &report.sarif {
        let line = match sarif {
            SarifInfo::Uploaded { id, .. } => format!("uploaded ({id})"),
            SarifInfo::Skipped { reason } => format!("skipped: {reason}"),
            SarifInfo::Failed { error, .. } => format!("failed: {error}"),
        };
        out.push_str(&format!("SARIF: {line}\n"));
    }
    if let Some(d) = &report.diagnostics {
        out.push_str(&format!("Diagnostics: {} ({} files)\n", d.location, d.files));
    }
    out
}
