//! ---
//! tpf_section: "01-core-functionality"
//! tpf_subsection: "module"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Shared primitives and utilities for the provisioning runtime."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
//! Shared primitives for the TPF Sync workspace.
//! This crate exposes configuration loading and logging utilities
//! consumed across the workspace.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, ConfigError, FailurePolicy, LoadedAppConfig, LoggingConfig, RunConfig, ServerConfig,
};
pub use logging::{init_tracing, shutdown_tracing, LogFormat};
