//! Environment-driven configuration.
//!
//! Every client in the workspace is built once at process start from an
//! [`AppConfig`] and passed down explicitly. Nothing reads the environment
//! after startup.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DOCDB_HOST: &str = "api.allenneuraldynamics.org";
pub const DEFAULT_DOCDB_DEV_HOST: &str = "api.allenneuraldynamics-test.org";
pub const DEFAULT_DATABASE: &str = "metadata_index";
pub const DEFAULT_COLLECTION: &str = "data_assets";
pub const DEFAULT_GITHUB_REPO: &str = "AllenNeuralDynamics/aind-scicomp-nautilex";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_INFERENCE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_INFERENCE_MODEL: &str = "claude-3-sonnet-20240229";

/// Which document store instance a client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEnv {
    Production,
    Development,
    Test,
}

impl TargetEnv {
    pub fn from_prod_flag(prod: bool) -> Self {
        if prod {
            TargetEnv::Production
        } else {
            TargetEnv::Development
        }
    }
}

impl std::fmt::Display for TargetEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TargetEnv::Production => "production",
            TargetEnv::Development => "development",
            TargetEnv::Test => "test",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDbConfig {
    pub host: String,
    pub dev_host: String,
    pub test_host: String,
    pub database: String,
    pub collection: String,
    /// `https` everywhere except local test servers
    pub scheme: String,
    pub version: String,
    pub timeout_secs: u64,
}

impl Default for DocDbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DOCDB_HOST.to_string(),
            dev_host: DEFAULT_DOCDB_DEV_HOST.to_string(),
            test_host: DEFAULT_DOCDB_DEV_HOST.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            scheme: "https".to_string(),
            version: "v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl DocDbConfig {
    pub fn host_for(&self, env: TargetEnv) -> &str {
        match env {
            TargetEnv::Production => &self.host,
            TargetEnv::Development => &self.dev_host,
            TargetEnv::Test => &self.test_host,
        }
    }

    /// `{scheme}://{host}/{version}/{database}/{collection}`
    pub fn collection_url(&self, env: TargetEnv) -> String {
        format!(
            "{}://{}/{}/{}/{}",
            self.scheme,
            self.host_for(env),
            self.version,
            self.database,
            self.collection
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_url: String,
    pub repo: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API.to_string(),
            repo: DEFAULT_GITHUB_REPO.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Plain-text schema descriptions appended to prompts
    pub schema_context_files: Vec<PathBuf>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.to_string(),
            model: DEFAULT_INFERENCE_MODEL.to_string(),
            api_key: None,
            max_tokens: 4096,
            temperature: 0.5,
            // short connect, very long read: generation can take minutes
            connect_timeout_secs: 20,
            read_timeout_secs: 2400,
            schema_context_files: Vec::new(),
        }
    }
}

impl InferenceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Concatenated contents of every schema context file
    pub fn load_schema_context(&self) -> Result<String, ConfigError> {
        let mut parts = Vec::with_capacity(self.schema_context_files.len());
        for path in &self.schema_context_files {
            let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            parts.push(text);
        }
        Ok(parts.join("\n\n"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub docdb: DocDbConfig,
    pub github: GithubConfig,
    pub inference: InferenceConfig,
    pub log_json: bool,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(host) = get("DOCDB_HOST") {
            config.docdb.host = host;
        }
        if let Some(host) = get("DOCDB_DEV_HOST") {
            config.docdb.test_host = host.clone();
            config.docdb.dev_host = host;
        }
        if let Some(host) = get("DOCDB_TEST_HOST") {
            config.docdb.test_host = host;
        }
        if let Some(db) = get("DOCDB_DATABASE") {
            config.docdb.database = db;
        }
        if let Some(collection) = get("DOCDB_COLLECTION") {
            config.docdb.collection = collection;
        }
        if let Some(scheme) = get("DOCDB_SCHEME") {
            if scheme != "http" && scheme != "https" {
                return Err(ConfigError::InvalidValue {
                    key: "DOCDB_SCHEME".to_string(),
                    value: scheme,
                });
            }
            config.docdb.scheme = scheme;
        }

        if let Some(url) = get("GITHUB_API_URL") {
            config.github.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(repo) = get("GITHUB_REPO") {
            if !repo.contains('/') {
                return Err(ConfigError::InvalidValue {
                    key: "GITHUB_REPO".to_string(),
                    value: repo,
                });
            }
            config.github.repo = repo;
        }
        config.github.token = get("GITHUB_TOKEN").or_else(|| get("GITHUB_ACCESS_TOKEN"));

        if let Some(url) = get("INFERENCE_BASE_URL") {
            config.inference.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("INFERENCE_MODEL") {
            config.inference.model = model;
        }
        config.inference.api_key = get("ANTHROPIC_API_KEY");
        if let Some(max) = get("INFERENCE_MAX_TOKENS") {
            config.inference.max_tokens =
                max.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "INFERENCE_MAX_TOKENS".to_string(),
                    value: max.clone(),
                })?;
        }
        if let Some(files) = get("SCHEMA_CONTEXT_FILES") {
            config.inference.schema_context_files = files
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        config.log_json = matches!(
            get("NAUTILEX_LOG_JSON").as_deref(),
            Some("1") | Some("true") | Some("yes")
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.docdb.host, DEFAULT_DOCDB_HOST);
        assert_eq!(config.docdb.database, "metadata_index");
        assert_eq!(config.docdb.collection, "data_assets");
        assert_eq!(config.github.repo, DEFAULT_GITHUB_REPO);
        assert!(config.github.token.is_none());
        assert_eq!(config.inference.connect_timeout_secs, 20);
        assert_eq!(config.inference.read_timeout_secs, 2400);
        assert!(!config.log_json);
    }

    #[test]
    fn test_collection_url_per_environment() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DOCDB_HOST", "prod.example.org"),
            ("DOCDB_DEV_HOST", "dev.example.org"),
        ]))
        .unwrap();

        assert_eq!(
            config.docdb.collection_url(TargetEnv::Production),
            "https://prod.example.org/v1/metadata_index/data_assets"
        );
        assert_eq!(
            config.docdb.collection_url(TargetEnv::Development),
            "https://dev.example.org/v1/metadata_index/data_assets"
        );
        // test host follows dev unless set explicitly
        assert_eq!(config.docdb.host_for(TargetEnv::Test), "dev.example.org");
    }

    #[test]
    fn test_github_token_fallback_and_blank_values() {
        let config =
            AppConfig::from_lookup(lookup(&[("GITHUB_TOKEN", "  "), ("GITHUB_ACCESS_TOKEN", "ghp_x")]))
                .unwrap();
        assert_eq!(config.github.token.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("GITHUB_REPO", "no-slash")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = AppConfig::from_lookup(lookup(&[("INFERENCE_MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_schema_context_loading() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("schema.txt");
        let b = dir.path().join("models.txt");
        std::fs::write(&a, "Model: Subject").unwrap();
        std::fs::write(&b, "Model: Modality").unwrap();

        let inference = InferenceConfig {
            schema_context_files: vec![a, b],
            ..InferenceConfig::default()
        };
        let text = inference.load_schema_context().unwrap();
        assert!(text.starts_with("Model: Subject"));
        assert!(text.ends_with("Model: Modality"));

        let missing = InferenceConfig {
            schema_context_files: vec![dir.path().join("nope.txt")],
            ..InferenceConfig::default()
        };
        assert!(missing.load_schema_context().is_err());
    }
}
