use crate::blob::{BlobStore, S3Location};
use crate::transform::RecordTransform;
use anyhow::{Context, Result};
use async_trait::async_trait;
use docdb::Record;
use serde_json::Value;
use std::sync::Arc;

const PROCESSING_FILE: &str = "processing.json";

/// Replace `processing` with the `processing.json` stored next to the asset
pub struct RepairProcessing {
    blobs: Arc<dyn BlobStore>,
}

impl RepairProcessing {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }
}

#[async_trait]
impl RecordTransform for RepairProcessing {
    fn name(&self) -> &str {
        "repair_processing"
    }

    async fn apply(&self, mut record: Record) -> Result<Record> {
        let location = record
            .section("location")
            .and_then(Value::as_str)
            .context("record has no location")?;
        let source = S3Location::parse(location)?.join(PROCESSING_FILE);
        let processing = self
            .blobs
            .get_json(&source)
            .await
            .with_context(|| format!("failed to retrieve processing data from {}", source))?;
        record.set_section("processing", processing);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBlobStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_processing_is_replaced_from_blob() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs
            .put(
                S3Location::parse("s3://bucket/asset_1/processing.json").unwrap(),
                json!({"processing_pipeline": {"pipeline_version": "1.0"}}),
            )
            .await;
        let repair = RepairProcessing::new(blobs);

        let record = Record::from_value(json!({
            "_id": "A",
            "location": "s3://bucket/asset_1",
            "processing": {"broken": true},
        }))
        .unwrap();
        let fixed = repair.apply(record).await.unwrap();
        assert_eq!(
            fixed.section("processing"),
            Some(&json!({"processing_pipeline": {"pipeline_version": "1.0"}}))
        );

        let missing = Record::from_value(json!({"_id": "B", "location": "s3://bucket/asset_2"})).unwrap();
        let err = repair.apply(missing).await.unwrap_err();
        assert!(err.to_string().contains("failed to retrieve processing data"));
    }
}
