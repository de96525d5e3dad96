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
use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::capabilities::{
    CollectionSource, FeatureProvisioning, ProjectContextProvider, ProjectSource, ScopedContext,
};
use crate::error::ServiceFailure;
use crate::types::{Collection, Feature, FeatureState, ProcessTemplateCandidate, Project};

/// Production adapter implementing every server capability over HTTP.
///
/// One instance serves the whole run; per-collection scoping lives in the
/// [`ScopedContext`] tokens, not in the client.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: String,
    api_version: String,
    config_db: String,
}

impl RestClient {
    /// Build a client for the given server base URL.
    pub fn new(
        server: Url,
        api_version: impl Into<String>,
        config_db: impl Into<String>,
    ) -> Result<Self, ServiceFailure> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base: server.as_str().trim_end_matches('/').to_owned(),
            api_version: api_version.into(),
            config_db: config_db.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn collection_url(&self, collection: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base, collection, path)
    }

    /// Send a request, enforce a success status, and return the raw body.
    async fn read_body(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<String, ServiceFailure> {
        let response = request
            .query(&[("api-version", self.api_version.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_failure(status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl CollectionSource for RestClient {
    async fn list_collections(&self) -> Result<Vec<Collection>, ServiceFailure> {
        let endpoint = self.url("_apis/projectCollections");
        debug!(%endpoint, "listing collections");
        let body = self.read_body(self.http.get(&endpoint)).await?;
        decode_collections(&body).map_err(|source| ServiceFailure::Decode {
            endpoint,
            source,
        })
    }
}

#[async_trait]
impl ProjectContextProvider for RestClient {
    async fn acquire_context(
        &self,
        collection: &Collection,
    ) -> Result<ScopedContext, ServiceFailure> {
        let endpoint = self.collection_url(&collection.name, "_apis/requestContexts");
        debug!(%endpoint, collection = %collection.name, "acquiring request context");
        let request = self.http.post(&endpoint).json(&serde_json::json!({
            "instanceId": collection.instance_id,
            "configDb": self.config_db,
        }));
        let body = self
            .read_body(request)
            .await
            .map_err(|source| ServiceFailure::during_context_acquisition(&collection.name, source))?;
        let token = decode_context_token(&body).map_err(|source| {
            ServiceFailure::during_context_acquisition(
                &collection.name,
                ServiceFailure::Decode { endpoint, source },
            )
        })?;
        Ok(ScopedContext::new(
            token,
            &collection.name,
            collection.instance_id,
        ))
    }

    async fn release_context(&self, context: ScopedContext) -> Result<(), ServiceFailure> {
        let collection = context.collection_name().to_owned();
        let token = context.into_token();
        let endpoint =
            self.collection_url(&collection, &format!("_apis/requestContexts/{token}"));
        debug!(%endpoint, %collection, "releasing request context");
        self.read_body(self.http.delete(&endpoint)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectSource for RestClient {
    async fn list_projects(
        &self,
        context: &ScopedContext,
        include_all: bool,
    ) -> Result<Vec<Project>, ServiceFailure> {
        let endpoint = self.collection_url(context.collection_name(), "_apis/projects");
        let state_filter = if include_all { "all" } else { "wellFormed" };
        debug!(%endpoint, state_filter, "listing projects");
        let request = self
            .http
            .get(&endpoint)
            .bearer_auth(context.token())
            .query(&[("stateFilter", state_filter)]);
        let body = self.read_body(request).await?;
        decode_projects(&body).map_err(|source| ServiceFailure::Decode { endpoint, source })
    }
}

#[async_trait]
impl FeatureProvisioning for RestClient {
    async fn get_features(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<Feature>, ServiceFailure> {
        let endpoint = self.collection_url(
            context.collection_name(),
            "_apis/featureProvisioning/features",
        );
        debug!(%endpoint, artifact_uri, "fetching feature states");
        let request = self
            .http
            .get(&endpoint)
            .bearer_auth(context.token())
            .query(&[("artifactUri", artifact_uri)]);
        let body = self.read_body(request).await?;
        decode_features(&body).map_err(|source| ServiceFailure::Decode { endpoint, source })
    }

    async fn validate_process_templates(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
    ) -> Result<Vec<ProcessTemplateCandidate>, ServiceFailure> {
        let endpoint = self.collection_url(
            context.collection_name(),
            "_apis/featureProvisioning/processTemplates",
        );
        debug!(%endpoint, artifact_uri, "validating process templates");
        let request = self
            .http
            .get(&endpoint)
            .bearer_auth(context.token())
            .query(&[("artifactUri", artifact_uri)]);
        let body = self.read_body(request).await?;
        decode_templates(&body).map_err(|source| ServiceFailure::Decode { endpoint, source })
    }

    async fn provision(
        &self,
        context: &ScopedContext,
        artifact_uri: &str,
        descriptor_id: i64,
    ) -> Result<(), ServiceFailure> {
        let endpoint = self.collection_url(
            context.collection_name(),
            "_apis/featureProvisioning/provision",
        );
        debug!(%endpoint, artifact_uri, descriptor_id, "provisioning features");
        let request = self
            .http
            .post(&endpoint)
            .bearer_auth(context.token())
            .json(&serde_json::json!({
                "artifactUri": artifact_uri,
                "templateDescriptorId": descriptor_id,
            }));
        self.read_body(request).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueEnvelope<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionDto {
    name: String,
    url: Url,
    instance_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDto {
    name: String,
    artifact_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum FeatureStateDto {
    NotConfigured,
    Configured,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureDto {
    name: String,
    state: FeatureStateDto,
    is_hidden: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateDto {
    descriptor_id: i64,
    descriptor_name: String,
    is_valid: bool,
}

#[derive(Debug, Deserialize)]
struct ContextDto {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDto {
    message: String,
}

fn api_failure(status: u16, body: &str) -> ServiceFailure {
    let message = serde_json::from_str::<ErrorDto>(body)
        .map(|error| error.message)
        .unwrap_or_else(|_| body.trim().to_owned());
    ServiceFailure::Api { status, message }
}

fn decode_collections(body: &str) -> Result<Vec<Collection>, serde_json::Error> {
    let envelope: ValueEnvelope<CollectionDto> = serde_json::from_str(body)?;
    Ok(envelope
        .value
        .into_iter()
        .map(|dto| Collection {
            name: dto.name,
            uri: dto.url,
            instance_id: dto.instance_id,
        })
        .collect())
}

fn decode_projects(body: &str) -> Result<Vec<Project>, serde_json::Error> {
    let envelope: ValueEnvelope<ProjectDto> = serde_json::from_str(body)?;
    Ok(envelope
        .value
        .into_iter()
        .map(|dto| Project {
            name: dto.name,
            artifact_uri: dto.artifact_uri,
        })
        .collect())
}

fn decode_features(body: &str) -> Result<Vec<Feature>, serde_json::Error> {
    let envelope: ValueEnvelope<FeatureDto> = serde_json::from_str(body)?;
    Ok(envelope
        .value
        .into_iter()
        .map(|dto| Feature {
            name: dto.name,
            state: match dto.state {
                FeatureStateDto::NotConfigured => FeatureState::NotConfigured,
                FeatureStateDto::Configured => FeatureState::Configured,
            },
            is_hidden: dto.is_hidden,
        })
        .collect())
}

fn decode_templates(body: &str) -> Result<Vec<ProcessTemplateCandidate>, serde_json::Error> {
    let envelope: ValueEnvelope<TemplateDto> = serde_json::from_str(body)?;
    Ok(envelope
        .value
        .into_iter()
        .map(|dto| ProcessTemplateCandidate {
            descriptor_id: dto.descriptor_id,
            name: dto.descriptor_name,
            is_valid: dto.is_valid,
        })
        .collect())
}

fn decode_context_token(body: &str) -> Result<String, serde_json::Error> {
    let dto: ContextDto = serde_json::from_str(body)?;
    Ok(dto.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_collection_listing() {
        let body = r#"{
            "value": [
                {
                    "name": "DefaultCollection",
                    "url": "https://tfs.example.com/tfs/DefaultCollection",
                    "instanceId": "0a2685be-cdbe-44c1-8dcb-40f892de8f17"
                },
                {
                    "name": "Other",
                    "url": "https://tfs.example.com/tfs/Other",
                    "instanceId": "3b1f7e04-52ef-4b18-b2bb-0ec4211b3867"
                }
            ]
        }"#;
        let collections = decode_collections(body).expect("decodes");
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].name, "DefaultCollection");
        assert_eq!(
            collections[0].uri.as_str(),
            "https://tfs.example.com/tfs/DefaultCollection"
        );
    }

    #[test]
    fn decodes_project_listing() {
        let body = r#"{
            "value": [
                { "name": "Alpha", "artifactUri": "vstfs:///Classification/TeamProject/aaa" }
            ]
        }"#;
        let projects = decode_projects(body).expect("decodes");
        assert_eq!(projects[0].name, "Alpha");
        assert_eq!(
            projects[0].artifact_uri,
            "vstfs:///Classification/TeamProject/aaa"
        );
    }

    #[test]
    fn decodes_feature_states() {
        let body = r#"{
            "value": [
                { "name": "backlog", "state": "notConfigured", "isHidden": false },
                { "name": "portfolio", "state": "configured", "isHidden": true }
            ]
        }"#;
        let features = decode_features(body).expect("decodes");
        assert_eq!(features[0].state, FeatureState::NotConfigured);
        assert!(!features[0].is_hidden);
        assert_eq!(features[1].state, FeatureState::Configured);
        assert!(features[1].is_hidden);
    }

    #[test]
    fn unknown_feature_state_is_a_decode_error() {
        let body = r#"{ "value": [ { "name": "x", "state": "pending", "isHidden": false } ] }"#;
        assert!(decode_features(body).is_err());
    }

    #[test]
    fn decodes_template_candidates() {
        let body = r#"{
            "value": [
                { "descriptorId": 7, "descriptorName": "Agile", "isValid": true },
                { "descriptorId": 9, "descriptorName": "Scrum", "isValid": false }
            ]
        }"#;
        let templates = decode_templates(body).expect("decodes");
        assert_eq!(templates[0].descriptor_id, 7);
        assert_eq!(templates[0].name, "Agile");
        assert!(templates[0].is_valid);
        assert!(!templates[1].is_valid);
    }

    #[test]
    fn decodes_context_token() {
        let body = r#"{ "token": "ctx-abc", "instanceId": "0a2685be-cdbe-44c1-8dcb-40f892de8f17" }"#;
        assert_eq!(decode_context_token(body).expect("decodes"), "ctx-abc");
    }

    #[test]
    fn api_failure_prefers_structured_message() {
        let failure = api_failure(403, r#"{ "message": "permission denied" }"#);
        match failure {
            ServiceFailure::Api { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[test]
    fn api_failure_falls_back_to_raw_body() {
        let failure = api_failure(500, "  internal error ");
        match failure {
            ServiceFailure::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }
}
