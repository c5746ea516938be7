use crate::error::{MigrationError, MigrationResult};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// `s3://bucket/prefix` location as stored on a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn parse(location: &str) -> MigrationResult<Self> {
        let rest = location
            .strip_prefix("s3://")
            .ok_or_else(|| MigrationError::blob(location, "expected an s3:// location"))?;
        let (bucket, key) = match rest.split_once('/') {
            Some((bucket, key)) => (bucket, key.trim_matches('/')),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(MigrationError::blob(location, "missing bucket name"));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn join(&self, name: &str) -> Self {
        let key = if self.key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.key, name)
        };
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl std::fmt::Display for S3Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Read access to JSON objects in the asset bucket
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_json(&self, location: &S3Location) -> MigrationResult<Value>;
}

/// Signed `GetObject` reads through the AWS SDK. Credentials and region come
/// from the default provider chain (environment, shared profile, instance role).
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::from_client(Client::new(&config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get_json(&self, location: &S3Location) -> MigrationResult<Value> {
        debug!(bucket = %location.bucket, key = %location.key, "Fetching blob");
        let object = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                MigrationError::blob(location.to_string(), DisplayErrorContext(&e).to_string())
            })?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|e| MigrationError::blob(location.to_string(), e.to_string()))?
            .into_bytes();
        serde_json::from_slice(&body)
            .map_err(|e| MigrationError::blob(location.to_string(), format!("invalid JSON: {}", e)))
    }
}

/// Blob store backed by a map, for tests and offline runs
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<S3Location, Value>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, location: S3Location, value: Value) {
        self.objects.write().await.insert(location, value);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_json(&self, location: &S3Location) -> MigrationResult<Value> {
        self.objects
            .read()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| MigrationError::blob(location.to_string(), "no such object"))
    }
}
