//! ---
//! tpf_section: "05-networking-external-interfaces"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Server capability boundary and REST adapter."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use url::Url;
use uuid::Uuid;

/// A top-level grouping of projects on the server, enumerated once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Human-readable collection name (exact-match filter target).
    pub name: String,
    /// Base URL of the collection instance.
    pub uri: Url,
    /// Instance identifier required when opening a request context.
    pub instance_id: Uuid,
}

/// A unit of work tracking within exactly one collection.
///
/// Read-only from this system's perspective; feature configuration is
/// mutated only through the provisioning capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    /// Opaque artifact URI keying all feature-provisioning calls.
    pub artifact_uri: String,
}

/// Provisioning state of a single project feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    NotConfigured,
    Configured,
}

/// A named configurable capability of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub state: FeatureState,
    pub is_hidden: bool,
}

impl Feature {
    /// A feature counts towards provisioning only when it is visible
    /// and not yet configured.
    pub fn needs_provisioning(&self) -> bool {
        self.state == FeatureState::NotConfigured && !self.is_hidden
    }
}

/// A candidate process template usable to provision a project's features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTemplateCandidate {
    /// Opaque descriptor row id passed back verbatim when provisioning.
    pub descriptor_id: i64,
    pub name: String,
    /// Whether the template satisfies the project's configuration requirements.
    pub is_valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(state: FeatureState, hidden: bool) -> Feature {
        Feature {
            name: "work-items".to_owned(),
            state,
            is_hidden: hidden,
        }
    }

    #[test]
    fn only_visible_unconfigured_features_need_provisioning() {
        assert!(feature(FeatureState::NotConfigured, false).needs_provisioning());
        assert!(!feature(FeatureState::NotConfigured, true).needs_provisioning());
        assert!(!feature(FeatureState::Configured, false).needs_provisioning());
        assert!(!feature(FeatureState::Configured, true).needs_provisioning());
    }
}
