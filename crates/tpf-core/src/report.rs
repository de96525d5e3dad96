//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Provisioning decision engine and run orchestration."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use parking_lot::Mutex;
use tpf_client::types::Project;

use crate::engine::DecisionOutcome;

/// What gets reported for one project: either the engine's decision or,
/// under the isolate failure policy, the failure that stopped it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectReport {
    Decision(DecisionOutcome),
    Failed(String),
}

/// Receives one report per project. Purely observational; implementations
/// must not affect control flow.
pub trait ReportSink: Send + Sync {
    fn report(&self, project: &Project, report: &ProjectReport);
}

/// Render the one-line status for a project.
pub fn format_report(project: &Project, report: &ProjectReport) -> String {
    match report {
        ProjectReport::Decision(DecisionOutcome::UpToDate) => {
            format!("{}: Project is up to date.", project.name)
        }
        ProjectReport::Decision(DecisionOutcome::NoValidTemplate) => {
            format!("{}: No valid process template found!", project.name)
        }
        ProjectReport::Decision(DecisionOutcome::ProvisionedWith(template)) => {
            format!("{}: Configured using settings from {}.", project.name, template)
        }
        ProjectReport::Decision(DecisionOutcome::AmbiguousTemplates(count)) => {
            format!(
                "{}: Multiple valid process templates found! ({})",
                project.name, count
            )
        }
        ProjectReport::Failed(message) => format!("{}: Failed: {}", project.name, message),
    }
}

/// Production sink printing one line per project to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn report(&self, project: &Project, report: &ProjectReport) {
        println!("{}", format_report(project, report));
    }
}

/// Test sink recording every report for later assertion.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, ProjectReport)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve all captured reports in arrival order.
    pub fn all(&self) -> Vec<(String, ProjectReport)> {
        self.records.lock().clone()
    }
}

impl ReportSink for MemorySink {
    fn report(&self, project: &Project, report: &ProjectReport) {
        self.records
            .lock()
            .push((project.name.clone(), report.clone()));
    }
}
