//! ---
//! tpf_section: "05-networking-external-interfaces"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Server capability boundary and REST adapter."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
//! Scriptable in-memory implementation of every server capability,
//! used by unit and integration tests to exercise the decision engine
//! and orchestrator without a live server.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;
use uuid::Uuid;

use crate::capabilities::{
    CollectionSource, FeatureProvisioning, ProjectContextProvider, ProjectSource, ScopedContext,
};
use crate::error::ServiceFailure;
use crate::types::{Collection, Feature, FeatureState, ProcessTemplateCandidate, Project};

#[derive(Debug, Default)]
struct State {
    collections: Vec<Collection>,
    projects: HashMap<String, Vec<Project>>,
    features: HashMap<String, Vec<Feature>>,
    templates: HashMap<String, Vec<ProcessTemplateCandidate>>,
    feature_failures: HashSet<String>,
    template_failures: HashSet<String>,
    provision_failures: HashSet<String>,
    context_failures: HashSet<String>,
    provision_calls: Vec<(String, i64)>,
    acquired: Vec<String>,
    released: Vec<String>,
    next_token: u64,
}

/// In-memory stand-in for the remote server.
///
/// Provisioning marks every feature of the target project as configured,
/// mirroring the remote layer's idempotent behavior.
#[derive(Debug, Default)]
pub struct InMemoryService {
    state: Mutex<State>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection and return its handle.
    pub fn add_collection(&self, name: &str) -> Collection {
        let collection = Collection {
            name: name.to_owned(),
            uri: Url::parse(&format!("https://tfs.example.com/tfs/{name}"))
                .unwrap_or_else(|_| panic!("collection name '{name}' does not form a URL")),
            instance_id: Uuid::new_v4(),
        };
        let mut state = self.state.lock();
        state.collections.push(collection.clone());
        state.projects.entry(name.to_owned()).or_default();
        collection
    }

    /// Register a project within a collection and return its handle.
    pub fn add_project(&self, collection: &str, name: &str) -> Project {
        let project = Project {
            name: name.to_owned(),
            artifact_uri: format!("vstfs:///Classification/TeamProject/{name}"),
        };
        self.state
            .lock()
            .projects
            .entry(collection.to_owned())
            .or_default()
            .push(project.clone());
        project
    }

    pub fn set_features(&self, artifact_uri: &str, features: Vec<Feature>) {
        self.state
            .lock()
            .features
            .insert(artifact_uri.to_owned(), features);
    }

    pub fn set_templates(&self, artifact_uri: &str, templates: Vec<ProcessTemplateCandidate>) {
        self.state
            .lock()
            .templates
            .insert(artifact_uri.to_owned(), templates);
    }

    /// Make `get_features` fail for the given project.
    pub fn fail_features(&self, artifact_uri: &str) {
        self.state
            .lock()
            .feature_failures
            .insert(artifact_uri.to_owned());
    }

    /// Make `validate_process_templates` fail for the given project.
    pub fn fail_templates(&self, artifact_uri: &str) {
        self.state
            .lock()
            .template_failures
            .insert(artifact_uri.to_owned());
    }

    /// Make `provision` fail for the given project.
    pub fn fail_provision(&self, artifact_uri: &str) {
        self.state
            .lock()
            .provision_failures
            .insert(artifact_uri.to_owned());
    }

    /// Make context acquisition fail for the given collection.
    pub fn fail_context(&self, collection: &str) {
        self.state
            .lock()
            .context_failures
            .insert(collection.to_owned());
    }

    /// Every `(artifact_uri, descriptor_id)` pair passed to `provision`.
    pub fn provision_calls(&self) -> Vec<(String, i64)> {
        self.state.lock().provision_calls.clone()
    }

    /// Collections for which a context was acquired, in order.
    pub fn acquired_contexts(&self) -> Vec<String> {
        self.state.lock().acquired.clone()
    }

    /// Collections for which a context was released, in order.
    pub fn released_contexts(&self) -> Vec<String> {
        self.state.lock().released.clone()
    }

    fn remote_down(detail: &str) -> ServiceFailure {
        ServiceFailure::Api {
            status: 503,
            message: format!("injected failure: {detail}"),
        }
    }
}

#[async_trait]
impl CollectionSource for InMemoryService {
    async fn list_collections(&self) -> Result<Vec<Collection>, ServiceFailure> {
        Ok(self.state.lock().collections.clone())
    }
}

#[async_trait]
impl ProjectContextProvider for InMemoryService {
    async fn acquire_context(
        &self,
        collection: &Collection,
    ) -> Result<ScopedContext, ServiceFailure> {
        let mut state = self.state.lock();
        if state.context_failures.contains(&collection.name) {
            return Err(ServiceFailure::during_context_acquisition(
                &collection.name,
                Self::remote_down("context chain"),
            ));
        }
        state.next_token += 1;
        let token = format!("ctx-{}", state.next_token);
        state.acquired.push(collection.name.clone());
        Ok(ScopedContext::new(
            token,
            &collection.name,
            collection.instance_id,
        ))
    }

    async fn release_context(&self, context: ScopedContext) -> Result<(), ServiceFailure> {
        let collection = context.collection_name().to_owned();
        let _ = context.into_token();
        self.state.lock().released.push(collection);
        Ok(())
    }
}

#[async_trait]
impl ProjectSource for InMemoryService {
    async fn list_projects(
        &self,
        context: &ScopedContext,
        _include_all: bool,
    ) -> Result<Vec<Project>, ServiceFailure> {
        Ok(self
            .state
            .lock()
            .projects
            .get(context.collection_name())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl FeatureProvisioning for InMemoryService {
    async fn get_features(
        &self,
        _context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<Feature>, ServiceFailure> {
        let state = self.state.lock();
        if state.feature_failures.contains(artifact_uri) {
            return Err(Self::remote_down("feature query"));
        }
        Ok(state.features.get(artifact_uri).cloned().unwrap_or_default())
    }

    async fn validate_process_templates(
        &self,
        _context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<ProcessTemplateCandidate>, ServiceFailure> {
        let state = self.state.lock();
        if state.template_failures.contains(artifact_uri) {
            return Err(Self::remote_down("template validation"));
        }
        Ok(state
            .templates
            .get(artifact_uri)
            .cloned()
            .unwrap_or_default())
    }

    async fn provision(
        &self,
        _context: &ScopedContext,
        artifact_uri: &str,
        descriptor_id: i64,
    ) -> Result<(), ServiceFailure> {
        let mut state = self.state.lock();
        state
            .provision_calls
            .push((artifact_uri.to_owned(), descriptor_id));
        if state.provision_failures.contains(artifact_uri) {
            return Err(Self::remote_down("provisioning action"));
        }
        if let Some(features) = state.features.get_mut(artifact_uri) {
            for feature in features.iter_mut() {
                feature.state = FeatureState::Configured;
            }
        }
        Ok(())
    }
}
