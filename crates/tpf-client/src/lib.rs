//! ---
//! tpf_section: "05-networking-external-interfaces"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Server capability boundary and REST adapter."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
//! External collaborator boundary for the project-management server.
//! The core crates depend only on the capability traits defined here;
//! [`rest::RestClient`] is the production adapter speaking the server's
//! HTTP API.

pub mod capabilities;
pub mod error;
pub mod memory;
pub mod rest;
pub mod types;

pub use capabilities::{
    CollectionSource, FeatureProvisioning, ProjectContextProvider, ProjectSource, ScopedContext,
};
pub use error::ServiceFailure;
pub use memory::InMemoryService;
pub use rest::RestClient;
pub use types::{Collection, Feature, FeatureState, ProcessTemplateCandidate, Project};
