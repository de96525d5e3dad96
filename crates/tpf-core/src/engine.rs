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

use tpf_client::capabilities::{FeatureProvisioning, ScopedContext};
use tpf_client::error::ServiceFailure;
use tpf_client::types::{Feature, Project};
use tracing::{debug, info};

/// Decision reached for one project during one run. Never persisted;
/// the remote service owns the actual feature configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// No visible unconfigured feature exists; nothing to do.
    UpToDate,
    /// The project needs provisioning but no template satisfies its
    /// configuration requirements.
    NoValidTemplate,
    /// Provisioning succeeded using the named template.
    ProvisionedWith(String),
    /// More than one valid template matched; deliberately left for a
    /// human because auto-selecting could silently misconfigure the
    /// project.
    AmbiguousTemplates(usize),
}

/// Per-project decision engine.
///
/// Derives every decision purely from the project's feature set and
/// template candidates at the moment of query; no state is cached
/// across projects. The provisioning call in the single-valid-template
/// branch is the engine's only mutation.
#[derive(Debug)]
pub struct ProvisioningEngine<S> {
    service: Arc<S>,
}

impl<S> ProvisioningEngine<S>
where
    S: FeatureProvisioning,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Decide and, when unambiguous, provision one project.
    pub async fn decide(
        &self,
        context: &ScopedContext,
        project: &Project,
    ) -> Result<DecisionOutcome, ServiceFailure> {
        let features = self
            .service
            .get_features(context, &project.artifact_uri)
            .await?;

        // Pure "already done" check. Does not distinguish fully
        // configured from partially configured by another tool.
        if !features.iter().any(Feature::needs_provisioning) {
            debug!(project = %project.name, "no visible unconfigured features");
            return Ok(DecisionOutcome::UpToDate);
        }

        let candidates = self
            .service
            .validate_process_templates(context, &project.artifact_uri)
            .await?;
        let valid: Vec<_> = candidates.iter().filter(|c| c.is_valid).collect();

        match valid.as_slice() {
            [] => {
                debug!(project = %project.name, "no valid process template");
                Ok(DecisionOutcome::NoValidTemplate)
            }
            [only] => {
                self.service
                    .provision(context, &project.artifact_uri, only.descriptor_id)
                    .await?;
                info!(
                    project = %project.name,
                    template = %only.name,
                    descriptor_id = only.descriptor_id,
                    "features provisioned"
                );
                Ok(DecisionOutcome::ProvisionedWith(only.name.clone()))
            }
            many => {
                debug!(project = %project.name, candidates = many.len(), "multiple valid templates");
                Ok(DecisionOutcome::AmbiguousTemplates(many.len()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpf_client::memory::InMemoryService;
    use tpf_client::types::{FeatureState, ProcessTemplateCandidate};
    use uuid::Uuid;

    fn context() -> ScopedContext {
        ScopedContext::new("ctx-test", "DefaultCollection", Uuid::nil())
    }

    fn feature(state: FeatureState, hidden: bool) -> Feature {
        Feature {
            name: "work-items".to_owned(),
            state,
            is_hidden: hidden,
        }
    }

    fn template(id: i64, name: &str, valid: bool) -> ProcessTemplateCandidate {
        ProcessTemplateCandidate {
            descriptor_id: id,
            name: name.to_owned(),
            is_valid: valid,
        }
    }

    fn engine_with(service: InMemoryService) -> (Arc<InMemoryService>, ProvisioningEngine<InMemoryService>) {
        let service = Arc::new(service);
        (service.clone(), ProvisioningEngine::new(service))
    }

    #[tokio::test]
    async fn single_valid_template_provisions_with_its_descriptor() {
        // Scenario: one visible unconfigured feature, one valid template.
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Alpha");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, false)],
        );
        service.set_templates(&project.artifact_uri, vec![template(7, "Agile", true)]);
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::ProvisionedWith("Agile".to_owned()));
        assert_eq!(
            service.provision_calls(),
            vec![(project.artifact_uri.clone(), 7)]
        );
    }

    #[tokio::test]
    async fn configured_project_is_up_to_date_without_mutation() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Beta");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::Configured, false)],
        );
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::UpToDate);
        assert!(service.provision_calls().is_empty());
    }

    #[tokio::test]
    async fn hidden_unconfigured_features_do_not_trigger_provisioning() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Hidden");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, true)],
        );
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::UpToDate);
        assert!(service.provision_calls().is_empty());
    }

    #[tokio::test]
    async fn zero_valid_templates_is_reported_without_mutation() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Gamma");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, false)],
        );
        service.set_templates(&project.artifact_uri, vec![]);
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::NoValidTemplate);
        assert!(service.provision_calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_templates_are_not_counted_as_candidates() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Mixed");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, false)],
        );
        service.set_templates(
            &project.artifact_uri,
            vec![template(1, "Agile", false), template(2, "Scrum", true)],
        );
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::ProvisionedWith("Scrum".to_owned()));
        assert_eq!(
            service.provision_calls(),
            vec![(project.artifact_uri.clone(), 2)]
        );
    }

    #[tokio::test]
    async fn multiple_valid_templates_are_ambiguous_without_mutation() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Delta");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, false)],
        );
        service.set_templates(
            &project.artifact_uri,
            vec![template(1, "Agile", true), template(2, "Scrum", true)],
        );
        let (service, engine) = engine_with(service);

        let outcome = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(outcome, DecisionOutcome::AmbiguousTemplates(2));
        assert!(service.provision_calls().is_empty());
    }

    #[tokio::test]
    async fn second_decision_after_provisioning_is_up_to_date() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Alpha");
        service.set_features(
            &project.artifact_uri,
            vec![feature(FeatureState::NotConfigured, false)],
        );
        service.set_templates(&project.artifact_uri, vec![template(7, "Agile", true)]);
        let (service, engine) = engine_with(service);

        let first = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(first, DecisionOutcome::ProvisionedWith("Agile".to_owned()));

        let second = engine.decide(&context(), &project).await.expect("decides");
        assert_eq!(second, DecisionOutcome::UpToDate);
        assert_eq!(service.provision_calls().len(), 1, "no second mutation");
    }

    #[tokio::test]
    async fn feature_query_failure_propagates() {
        let service = InMemoryService::new();
        let project = service.add_project("DefaultCollection", "Broken");
        service.fail_features(&project.artifact_uri);
        let (service, engine) = engine_with(service);

        let failure = engine
            .decide(&context(), &project)
            .await
            .expect_err("must fail");
        assert!(matches!(failure, ServiceFailure::Api { status: 503, .. }));
        assert!(service.provision_calls().is_empty());
    }
}
