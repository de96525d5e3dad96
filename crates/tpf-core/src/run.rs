//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Provisioning decision engine and run orchestration."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use std::sync::Arc;

use tpf_client::capabilities::{
    CollectionSource, FeatureProvisioning, ProjectContextProvider, ProjectSource, ScopedContext,
};
use tpf_client::error::ServiceFailure;
use tpf_common::config::{FailurePolicy, RunConfig};
use tracing::{error, info, warn};

use crate::engine::{DecisionOutcome, ProvisioningEngine};
use crate::report::{ProjectReport, ReportSink};

/// Aggregate counters for one run. Used for the final log line and the
/// process exit code; the sink itself stays aggregation-free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub collections_processed: usize,
    pub projects_processed: usize,
    pub up_to_date: usize,
    pub provisioned: usize,
    pub no_valid_template: usize,
    pub ambiguous: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, outcome: &DecisionOutcome) {
        self.projects_processed += 1;
        match outcome {
            DecisionOutcome::UpToDate => self.up_to_date += 1,
            DecisionOutcome::ProvisionedWith(_) => self.provisioned += 1,
            DecisionOutcome::NoValidTemplate => self.no_valid_template += 1,
            DecisionOutcome::AmbiguousTemplates(_) => self.ambiguous += 1,
        }
    }
}

/// Drives the outer loop: collection filter → context acquisition →
/// project enumeration → per-project decision → reporting.
///
/// Strictly sequential; projects are processed in the enumeration order
/// returned by the server and collections in listing order. The request
/// context is scoped per collection and released on every exit path.
pub struct RunOrchestrator<S> {
    service: Arc<S>,
    engine: ProvisioningEngine<S>,
    sink: Arc<dyn ReportSink>,
    run: RunConfig,
}

impl<S> RunOrchestrator<S>
where
    S: CollectionSource + ProjectContextProvider + ProjectSource + FeatureProvisioning,
{
    pub fn new(service: Arc<S>, sink: Arc<dyn ReportSink>, run: RunConfig) -> Self {
        Self {
            engine: ProvisioningEngine::new(service.clone()),
            service,
            sink,
            run,
        }
    }

    /// Execute one provisioning sweep over the configured collection.
    pub async fn run(&self) -> Result<RunSummary, ServiceFailure> {
        let mut summary = RunSummary::default();
        let collections = self.service.list_collections().await?;
        info!(
            available = collections.len(),
            filter = %self.run.collection,
            "collections listed"
        );

        // Exact, case-sensitive name match; non-matching collections are
        // skipped without acquiring a context.
        for collection in collections
            .into_iter()
            .filter(|c| c.name == self.run.collection)
        {
            info!(collection = %collection.name, instance_id = %collection.instance_id, "processing collection");
            let context = match self.service.acquire_context(&collection).await {
                Ok(context) => context,
                Err(failure) => {
                    if self.run.failure_policy == FailurePolicy::Abort {
                        return Err(failure);
                    }
                    error!(collection = %collection.name, error = %failure, "context acquisition failed; skipping collection");
                    summary.failed += 1;
                    continue;
                }
            };

            let result = self.process_collection(&context, &mut summary).await;
            if let Err(failure) = self.service.release_context(context).await {
                warn!(collection = %collection.name, error = %failure, "failed to release request context");
            }

            match result {
                Ok(()) => summary.collections_processed += 1,
                Err(failure) => {
                    if self.run.failure_policy == FailurePolicy::Abort {
                        return Err(failure);
                    }
                    error!(collection = %collection.name, error = %failure, "collection aborted");
                    summary.failed += 1;
                }
            }
        }

        info!(
            collections = summary.collections_processed,
            projects = summary.projects_processed,
            provisioned = summary.provisioned,
            up_to_date = summary.up_to_date,
            no_valid_template = summary.no_valid_template,
            ambiguous = summary.ambiguous,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    /// Decide every project in the collection the context is scoped to.
    ///
    /// Returns `Err` only for failures that abort the collection: project
    /// enumeration failures always do; per-project decision failures do
    /// under [`FailurePolicy::Abort`], and are reported and counted under
    /// [`FailurePolicy::Isolate`].
    async fn process_collection(
        &self,
        context: &ScopedContext,
        summary: &mut RunSummary,
    ) -> Result<(), ServiceFailure> {
        let projects = self
            .service
            .list_projects(context, self.run.include_all_projects)
            .await?;
        info!(
            collection = %context.collection_name(),
            projects = projects.len(),
            include_all = self.run.include_all_projects,
            "projects enumerated"
        );

        for project in projects {
            match self.engine.decide(context, &project).await {
                Ok(outcome) => {
                    summary.record(&outcome);
                    self.sink.report(&project, &ProjectReport::Decision(outcome));
                }
                Err(failure) => match self.run.failure_policy {
                    FailurePolicy::Abort => return Err(failure),
                    FailurePolicy::Isolate => {
                        error!(project = %project.name, error = %failure, "project decision failed");
                        summary.projects_processed += 1;
                        summary.failed += 1;
                        self.sink
                            .report(&project, &ProjectReport::Failed(failure.to_string()));
                    }
                },
            }
        }
        Ok(())
    }
}
