//! ---
//! tpf_section: "05-networking-external-interfaces"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Server capability boundary and REST adapter."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use thiserror::Error;

/// Failure raised by any remote capability call.
///
/// Whether a `ServiceFailure` aborts the whole run or only the current
/// project is decided by the orchestrator's failure policy, not here.
#[derive(Debug, Error)]
pub enum ServiceFailure {
    /// The request never completed (connection refused, TLS, timeout).
    #[error("transport error talking to the server")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server rejected the request with status {status}: {message}")]
    Api { status: u16, message: String },
    /// The response body did not match the expected shape.
    #[error("failed to decode server response from {endpoint}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    /// The host/context/identity chain could not be completed for a collection.
    #[error("failed to acquire request context for collection '{collection}'")]
    ContextAcquisition {
        collection: String,
        #[source]
        source: Box<ServiceFailure>,
    },
}

impl ServiceFailure {
    /// Wrap a failure that occurred while opening a collection context.
    pub fn during_context_acquisition(collection: impl Into<String>, source: Self) -> Self {
        Self::ContextAcquisition {
            collection: collection.into(),
            source: Box::new(source),
        }
    }
}
