//! ---
//! tpf_section: "05-networking-external-interfaces"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Server capability boundary and REST adapter."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::error::ServiceFailure;
use crate::types::{Collection, Feature, ProcessTemplateCandidate, Project};

/// Authorization handle scoped to one collection instance.
///
/// The foreign chain (deployment host → system context → identity →
/// user request context) is collapsed behind [`ProjectContextProvider`];
/// this struct only carries the resulting opaque token. Contexts must be
/// handed back through `release_context`; dropping one unreleased logs a
/// warning because the remote side keeps the request open until told
/// otherwise.
#[derive(Debug)]
pub struct ScopedContext {
    token: String,
    collection: String,
    instance_id: Uuid,
    released: bool,
}

impl ScopedContext {
    /// Construct a context from an acquired token.
    pub fn new(token: impl Into<String>, collection: impl Into<String>, instance_id: Uuid) -> Self {
        Self {
            token: token.into(),
            collection: collection.into(),
            instance_id,
            released: false,
        }
    }

    /// Opaque authorization token sent with every per-project call.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Name of the collection this context is scoped to.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Instance identifier of the collection host.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Consume the context, yielding the raw token and disarming the
    /// leak warning. Called by providers when releasing.
    pub fn into_token(mut self) -> String {
        self.released = true;
        std::mem::take(&mut self.token)
    }
}

impl Drop for ScopedContext {
    fn drop(&mut self) {
        if !self.released {
            warn!(collection = %self.collection, "request context dropped without release");
        }
    }
}

/// Enumerates the collections available on the server.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<Collection>, ServiceFailure>;
}

/// Opens and closes request contexts scoped to one collection.
#[async_trait]
pub trait ProjectContextProvider: Send + Sync {
    /// Acquire the capability token required for per-project operations.
    async fn acquire_context(
        &self,
        collection: &Collection,
    ) -> Result<ScopedContext, ServiceFailure>;

    /// Release a previously acquired context.
    async fn release_context(&self, context: ScopedContext) -> Result<(), ServiceFailure>;
}

/// Enumerates the projects within the collection a context is scoped to.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// List projects; `include_all` also returns projects marked for
    /// deletion or otherwise non-default.
    async fn list_projects(
        &self,
        context: &ScopedContext,
        include_all: bool,
    ) -> Result<Vec<Project>, ServiceFailure>;
}

/// Feature state, template validation, and the provisioning action.
/// The only capability that can mutate remote state.
#[async_trait]
pub trait FeatureProvisioning: Send + Sync {
    async fn get_features(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<Feature>, ServiceFailure>;

    async fn validate_process_templates(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<ProcessTemplateCandidate>, ServiceFailure>;

    /// Apply the template identified by `descriptor_id` to the project.
    /// Idempotent at the remote layer.
    async fn provision(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
        descriptor_id: i64,
    ) -> Result<(), ServiceFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_token_yields_the_acquired_token() {
        let context = ScopedContext::new("token-123", "DefaultCollection", Uuid::nil());
        assert_eq!(context.token(), "token-123");
        assert_eq!(context.collection_name(), "DefaultCollection");
        assert_eq!(context.into_token(), "token-123");
    }
}
