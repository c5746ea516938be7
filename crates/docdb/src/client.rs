use crate::error::{DocDbError, DocDbResult};
use crate::filter::{Filter, Projection};
use crate::record::Record;
use crate::store::RecordStore;
use async_trait::async_trait;
use common::{DocDbConfig, TargetEnv, UpstreamError};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// HTTP client for the metadata document database API
#[derive(Debug, Clone)]
pub struct MetadataDbClient {
    client: Client,
    base_url: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountResponse {
    Bare(u64),
    Wrapped { count: u64 },
}

impl MetadataDbClient {
    pub fn new(config: &DocDbConfig, env: TargetEnv) -> DocDbResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.collection_url(env),
            name: format!("docdb:{}", env),
        })
    }

    /// Point at an explicit collection URL (local servers, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> DocDbResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            name: "docdb".to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(&self, response: Response) -> DocDbResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(store = %self.name, status = status.as_u16(), "Unexpected response from docdb");
        Err(UpstreamError::new(self.name.clone(), status.as_u16(), body).into())
    }
}

#[async_trait]
impl RecordStore for MetadataDbClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
        limit: Option<usize>,
    ) -> DocDbResult<Vec<Record>> {
        filter.validate()?;
        let mut query = vec![("filter", filter.to_json())];
        if let Some(projection) = projection {
            query.push(("projection", projection.to_json()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        debug!(store = %self.name, filter = %filter.to_json(), "Retrieving records");
        let response = self
            .client
            .get(format!("{}/find", self.base_url))
            .query(&query)
            .send()
            .await?;
        let response = self.check(response).await?;

        let values: Vec<Value> = serde_json::from_str(&response.text().await?)?;
        let records = values
            .into_iter()
            .map(Record::from_value)
            .collect::<DocDbResult<Vec<_>>>()?;
        info!(store = %self.name, records = records.len(), "Retrieved records");
        Ok(records)
    }

    async fn count(&self, filter: &Filter) -> DocDbResult<u64> {
        filter.validate()?;
        let response = self
            .client
            .get(format!("{}/count_documents", self.base_url))
            .query(&[("filter", filter.to_json())])
            .send()
            .await?;
        let response = self.check(response).await?;

        let count: CountResponse = serde_json::from_str(&response.text().await?)?;
        Ok(match count {
            CountResponse::Bare(n) | CountResponse::Wrapped { count: n } => n,
        })
    }

    async fn replace_sections(&self, id: &str, sections: &Map<String, Value>) -> DocDbResult<()> {
        if sections.is_empty() {
            return Ok(());
        }
        let body = json!({
            "filter": {"_id": id},
            "update": {"$set": Value::Object(sections.clone())},
        });

        let response = self
            .client
            .post(format!("{}/update_one", self.base_url))
            .json(&body)
            .send()
            .await?;
        self.check(response).await.map_err(|e| match e {
            DocDbError::Upstream(upstream) if upstream.status == 404 => {
                DocDbError::NotFound(id.to_string())
            }
            other => other,
        })?;

        info!(store = %self.name, record_id = id, sections = sections.len(), "Replaced sections");
        Ok(())
    }
}
