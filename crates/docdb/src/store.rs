use crate::error::DocDbResult;
use crate::filter::{Filter, Projection};
use crate::record::Record;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

/// Upper bound of ids sent in a single `$in` query
pub const DEFAULT_BATCH_SIZE: usize = 150;

/// Query and per-section write access to the metadata store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short label for logs and reports
    fn name(&self) -> &str;

    async fn retrieve(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
        limit: Option<usize>,
    ) -> DocDbResult<Vec<Record>>;

    async fn count(&self, filter: &Filter) -> DocDbResult<u64>;

    /// Replace the given top-level sections of one record, leaving the rest untouched
    async fn replace_sections(&self, id: &str, sections: &Map<String, Value>) -> DocDbResult<()>;
}

/// Fetch records for a long id list in fixed-size chunks
pub async fn retrieve_by_ids<S: AsRef<str>>(
    store: &dyn RecordStore,
    ids: &[S],
    projection: Option<&Projection>,
    batch_size: usize,
) -> DocDbResult<Vec<Record>> {
    let batch_size = batch_size.max(1);
    let mut records = Vec::with_capacity(ids.len());
    for (index, chunk) in ids.chunks(batch_size).enumerate() {
        debug!(
            store = store.name(),
            batch = index,
            size = chunk.len(),
            "Retrieving id batch"
        );
        let filter = Filter::by_ids(chunk);
        records.extend(store.retrieve(&filter, projection, None).await?);
    }
    Ok(records)
}
