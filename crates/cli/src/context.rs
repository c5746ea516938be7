use anyhow::{Context, Result};
use common::{AppConfig, TargetEnv};
use docdb::{MetadataDbClient, RecordStore};
use github::{GithubClient, IssueTracker};
use llm::{AnthropicProvider, InferenceProvider};
use migrate::{BlobStore, MigrationTargets, S3BlobStore};
use std::sync::Arc;
use tracing::debug;

/// Configuration shared by every command; each accessor builds the client it needs
pub struct AppContext {
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn store(&self, env: TargetEnv) -> Result<Arc<dyn RecordStore>> {
        let client = MetadataDbClient::new(&self.config.docdb, env)
            .with_context(|| format!("failed to build docdb client for {}", env))?;
        debug!(env = %env, url = client.base_url(), "Built docdb client");
        Ok(Arc::new(client))
    }

    /// The migration target for `env` plus the test store
    pub fn migration_targets(&self, env: TargetEnv) -> Result<MigrationTargets> {
        let mut targets = MigrationTargets::new().with(env, self.store(env)?);
        if env != TargetEnv::Test {
            targets = targets.with(TargetEnv::Test, self.store(TargetEnv::Test)?);
        }
        Ok(targets)
    }

    pub fn tracker(&self) -> Result<Arc<dyn IssueTracker>> {
        let client = GithubClient::from_config(&self.config.github)
            .context("failed to build GitHub client")?;
        Ok(Arc::new(client))
    }

    pub fn inference(&self) -> Result<Arc<dyn InferenceProvider>> {
        let provider = AnthropicProvider::from_config(&self.config.inference)
            .context("failed to build inference client (is ANTHROPIC_API_KEY set?)")?;
        Ok(Arc::new(provider))
    }

    /// Signed S3 reads using the default AWS credential chain
    pub async fn blobs(&self) -> Arc<dyn BlobStore> {
        Arc::new(S3BlobStore::from_env().await)
    }

    pub fn schema_context(&self) -> Result<String> {
        Ok(self.config.inference.load_schema_context()?)
    }
}
