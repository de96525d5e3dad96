//! ---
//! tpf_section: "15-testing-qa-runbook"
//! tpf_subsection: "integration-tests"
//! tpf_type: "source"
//! tpf_scope: "code"
//! tpf_description: "Configuration loading tests covering file candidates and env overrides."
//! tpf_version: "v0.1.0"
//! tpf_owner: "tbd"
//! ---
use std::fs;

use tpf_common::config::{AppConfig, ConfigError, ENV_CONFIG_DB, ENV_SERVER_URL};

// This suite owns the TPF_* environment variables; it runs in its own
// process and keeps every env-touching assertion in one serial test to
// avoid interference between parallel test threads.
#[test]
fn env_overrides_win_over_file_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tpf.toml");
    fs::write(
        &path,
        r#"
            [server]
            url = "https://file.example.com/tfs"
            config_db = "Data Source=file-sql"
        "#,
    )
    .expect("write config");

    std::env::set_var(ENV_SERVER_URL, "https://env.example.com/tfs");
    std::env::set_var(ENV_CONFIG_DB, "Data Source=env-sql");
    std::env::set_var(AppConfig::ENV_CONFIG_PATH, &path);

    let loaded = AppConfig::load_with_source::<&str>(&[]).expect("config loads via env path");
    assert_eq!(loaded.source, path);
    assert_eq!(loaded.config.server.url, "https://env.example.com/tfs");
    assert_eq!(loaded.config.server.config_db, "Data Source=env-sql");

    // An explicitly supplied path beats the TPF_CONFIG override outright.
    let explicit = dir.path().join("explicit.toml");
    fs::write(
        &explicit,
        r#"
            [server]
            url = "https://env.example.com/tfs"
            config_db = "Data Source=explicit-sql"
        "#,
    )
    .expect("write config");
    let loaded = AppConfig::load_path(&explicit).expect("explicit path loads");
    assert_eq!(loaded.source, explicit);
    assert_eq!(loaded.config.server.config_db, "Data Source=env-sql");
    std::env::remove_var(ENV_CONFIG_DB);
    let loaded = AppConfig::load_path(&explicit).expect("explicit path loads");
    assert_eq!(loaded.config.server.config_db, "Data Source=explicit-sql");
    std::env::set_var(ENV_CONFIG_DB, "Data Source=env-sql");

    // A missing explicit path is an error rather than a silent fall-through
    // to the TPF_CONFIG file or the candidate list.
    let err = AppConfig::load_path(dir.path().join("absent.toml")).expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));

    // With the overrides cleared the file values come through again.
    std::env::remove_var(ENV_SERVER_URL);
    std::env::remove_var(ENV_CONFIG_DB);
    let loaded = AppConfig::load_with_source::<&str>(&[]).expect("config loads");
    assert_eq!(loaded.config.server.url, "https://file.example.com/tfs");
    std::env::remove_var(AppConfig::ENV_CONFIG_PATH);

    // Required keys must fail fast before any remote call; asserted here
    // (after clearing the overrides) because the env vars would mask the
    // missing key in a parallel test.
    let incomplete = dir.path().join("incomplete.toml");
    fs::write(
        &incomplete,
        "[server]\nurl = \"https://tfs.example.com/tfs\"\n",
    )
    .expect("write config");
    let err = AppConfig::load(&[incomplete]).expect_err("config_db is required");
    assert!(matches!(
        err,
        ConfigError::MissingKey {
            key: "server.config_db"
        }
    ));
}
