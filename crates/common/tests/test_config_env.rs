use common::{AppConfig, ConfigError, TargetEnv};
use serial_test::serial;
use std::env;

const KEYS: &[&str] = &[
    "DOCDB_HOST",
    "DOCDB_DEV_HOST",
    "DOCDB_TEST_HOST",
    "DOCDB_SCHEME",
    "GITHUB_REPO",
    "GITHUB_TOKEN",
    "GITHUB_ACCESS_TOKEN",
    "ANTHROPIC_API_KEY",
    "INFERENCE_MODEL",
    "SCHEMA_CONTEXT_FILES",
    "NAUTILEX_LOG_JSON",
];

fn clear_env() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_reads_process_environment() {
    clear_env();
    env::set_var("DOCDB_HOST", "docdb.internal");
    env::set_var("DOCDB_TEST_HOST", "docdb-test.internal");
    env::set_var("GITHUB_REPO", "octo/metadata-issues");
    env::set_var("GITHUB_TOKEN", "ghp_test");
    env::set_var("ANTHROPIC_API_KEY", "sk-test");
    env::set_var("INFERENCE_MODEL", "claude-3-haiku-20240307");
    env::set_var("NAUTILEX_LOG_JSON", "true");

    let config = AppConfig::from_env().unwrap();
    clear_env();

    assert_eq!(
        config.docdb.collection_url(TargetEnv::Production),
        "https://docdb.internal/v1/metadata_index/data_assets"
    );
    assert_eq!(config.docdb.host_for(TargetEnv::Test), "docdb-test.internal");
    assert_eq!(config.github.repo, "octo/metadata-issues");
    assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
    assert_eq!(config.inference.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.inference.model, "claude-3-haiku-20240307");
    assert!(config.log_json);
}

#[test]
#[serial]
fn test_schema_context_files_are_split_on_commas() {
    clear_env();
    env::set_var("SCHEMA_CONTEXT_FILES", "core.txt, , models/acquisition.txt");

    let config = AppConfig::from_env().unwrap();
    clear_env();

    let files: Vec<_> = config
        .inference
        .schema_context_files
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect();
    assert_eq!(files, vec!["core.txt", "models/acquisition.txt"]);
}

#[test]
#[serial]
fn test_invalid_scheme_is_rejected() {
    clear_env();
    env::set_var("DOCDB_SCHEME", "ftp");

    let result = AppConfig::from_env();
    clear_env();

    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { ref key, .. }) if key == "DOCDB_SCHEME"
    ));
}

#[test]
#[serial]
fn test_secrets_are_not_serialized() {
    clear_env();
    env::set_var("GITHUB_TOKEN", "ghp_secret");
    env::set_var("ANTHROPIC_API_KEY", "sk-secret");

    let config = AppConfig::from_env().unwrap();
    clear_env();

    let dumped = serde_json::to_string(&config).unwrap();
    assert!(!dumped.contains("ghp_secret"));
    assert!(!dumped.contains("sk-secret"));
}
