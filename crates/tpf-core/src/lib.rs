//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Provisioning decision engine and run orchestration."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
//! Core of TPF Sync: the per-project provisioning decision engine, the
//! sequential run orchestrator driving collections and projects, and
//! the reporting sink receiving one outcome per project.

pub mod engine;
pub mod report;
pub mod run;

pub use engine::{DecisionOutcome, ProvisioningEngine};
pub use report::{format_report, MemorySink, ProjectReport, ReportSink, StdoutSink};
pub use run::{RunOrchestrator, RunSummary};
