use crate::error::{DocDbError, DocDbResult};
use crate::filter::{Filter, Projection};
use crate::record::Record;
use crate::store::RecordStore;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// One call to [`RecordStore::replace_sections`]
#[derive(Debug, Clone, PartialEq)]
pub struct WriteLogEntry {
    pub id: String,
    pub sections: Vec<String>,
}

/// Process-local record store, ordered by `_id`
#[derive(Default)]
pub struct InMemoryStore {
    name: String,
    records: RwLock<BTreeMap<String, Record>>,
    writes: Mutex<Vec<WriteLogEntry>>,
    failing_ids: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_records(name: impl Into<String>, records: Vec<Record>) -> DocDbResult<Self> {
        let store = Self::new(name);
        {
            let mut map = store.records.try_write().map_err(|_| {
                DocDbError::InvalidRecord("store is locked during construction".to_string())
            })?;
            for record in records {
                let id = record.require_id()?.to_string();
                map.insert(id, record);
            }
        }
        Ok(store)
    }

    pub async fn insert(&self, record: Record) -> DocDbResult<()> {
        let id = record.require_id()?.to_string();
        self.records.write().await.insert(id, record);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Record> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Every write accepted so far, in call order
    pub async fn writes(&self) -> Vec<WriteLogEntry> {
        self.writes.lock().await.clone()
    }

    /// Make writes to `id` fail, for exercising partial-batch failures
    pub async fn fail_writes_for(&self, id: impl Into<String>) {
        self.failing_ids.lock().await.insert(id.into());
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn retrieve(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
        limit: Option<usize>,
    ) -> DocDbResult<Vec<Record>> {
        let records = self.records.read().await;
        let mut out = Vec::new();
        for record in records.values() {
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
            if filter.matches(record)? {
                out.push(match projection {
                    Some(p) => p.apply(record)?,
                    None => record.clone(),
                });
            }
        }
        debug!(store = %self.name, matched = out.len(), "In-memory retrieve");
        Ok(out)
    }

    async fn count(&self, filter: &Filter) -> DocDbResult<u64> {
        let records = self.records.read().await;
        let mut count = 0u64;
        for record in records.values() {
            if filter.matches(record)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn replace_sections(&self, id: &str, sections: &Map<String, Value>) -> DocDbResult<()> {
        if self.failing_ids.lock().await.contains(id) {
            return Err(DocDbError::WriteFailed {
                id: id.to_string(),
                reason: "write rejected by store".to_string(),
            });
        }

        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DocDbError::NotFound(id.to_string()))?;
        for (name, value) in sections {
            record.set_section(name.clone(), value.clone());
        }
        drop(records);

        self.writes.lock().await.push(WriteLogEntry {
            id: id.to_string(),
            sections: sections.keys().cloned().collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> InMemoryStore {
        InMemoryStore::with_records(
            "test",
            vec![
                Record::from_value(json!({"_id": "A", "acquisition": {"x": 1}, "subject": {"id": 1}}))
                    .unwrap(),
                Record::from_value(json!({"_id": "B", "acquisition": {"x": 2}})).unwrap(),
                Record::from_value(json!({"_id": "C", "subject": {"id": 3}})).unwrap(),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_count_and_limit() {
        let store = sample();
        let filter = Filter::new(json!({"acquisition": {"$exists": true}})).unwrap();

        assert_eq!(store.count(&filter).await.unwrap(), 2);
        assert_eq!(store.retrieve(&filter, None, None).await.unwrap().len(), 2);
        assert_eq!(store.retrieve(&Filter::all(), None, Some(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_sections_only_touches_named_sections() {
        let store = sample();
        let mut sections = Map::new();
        sections.insert("acquisition".to_string(), json!({"x": 10}));

        store.replace_sections("A", &sections).await.unwrap();

        let a = store.get("A").await.unwrap();
        assert_eq!(a.section("acquisition"), Some(&json!({"x": 10})));
        assert_eq!(a.section("subject"), Some(&json!({"id": 1})));
        assert_eq!(
            store.writes().await,
            vec![WriteLogEntry {
                id: "A".to_string(),
                sections: vec!["acquisition".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_write_failures() {
        let store = sample();
        let sections = Map::new();

        assert!(matches!(
            store.replace_sections("missing", &sections).await,
            Err(DocDbError::NotFound(_))
        ));

        store.fail_writes_for("B").await;
        assert!(matches!(
            store.replace_sections("B", &sections).await,
            Err(DocDbError::WriteFailed { .. })
        ));
        assert!(store.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_by_ids_in_batches() {
        let store = sample();
        let ids = ["A", "B", "C", "Z"];
        let records = crate::store::retrieve_by_ids(&store, &ids, None, 2).await.unwrap();
        let found: Vec<_> = records.iter().filter_map(|r| r.id()).collect();
        assert_eq!(found, vec!["A", "B", "C"]);
    }
}
