use crate::envelope::HttpEnvelope;
use common::NautilexError;
use docdb::{DocDbError, Filter, Projection, RecordStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Project queried when a `filter` event carries no filter of its own
pub const DEFAULT_PROJECT: &str = "Thalamus in the Middle";
pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocDbAction {
    Count,
    Filter,
    Aggregation,
}

const ACTIONS: &[(&str, DocDbAction)] = &[
    ("count", DocDbAction::Count),
    ("filter", DocDbAction::Filter),
    ("aggregation", DocDbAction::Aggregation),
];

impl DocDbAction {
    pub fn lookup(name: &str) -> Option<Self> {
        ACTIONS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, action)| *action)
    }
}

/// `{"action": "count" | "filter" | "aggregation", ...}` events against the record store
pub struct DocDbHandler {
    store: Arc<dyn RecordStore>,
}

impl DocDbHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, event: &Value) -> HttpEnvelope {
        let action_name = event.get("action").and_then(Value::as_str);
        let Some(action) = action_name.and_then(DocDbAction::lookup) else {
            let shown = match event.get("action") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "<missing>".to_string(),
            };
            warn!(action = %shown, "Unknown docdb action");
            return HttpEnvelope::error(400, format!("Unknown action: {}", shown));
        };

        info!(?action, store = self.store.name(), "Handling docdb event");
        let result = match action {
            DocDbAction::Count => self.count(event).await,
            DocDbAction::Filter => self.filter(event).await,
            DocDbAction::Aggregation => {
                return HttpEnvelope::error(501, "Aggregation not implemented yet");
            }
        };

        match result {
            Ok(payload) => HttpEnvelope::ok(&payload),
            Err(err) => {
                let err = NautilexError::from(err);
                warn!(error = %err, "docdb action failed");
                HttpEnvelope::error(err.status_code(), err.to_string())
            }
        }
    }

    async fn count(&self, event: &Value) -> Result<Value, DocDbError> {
        let filter = match event.get("filter") {
            Some(value) => Filter::new(value.clone())?,
            None => Filter::all(),
        };
        let count = self.store.count(&filter).await?;
        info!(count, "Counted records");
        Ok(json!(count))
    }

    async fn filter(&self, event: &Value) -> Result<Value, DocDbError> {
        let filter = match event.get("filter") {
            Some(value) => Filter::new(value.clone())?,
            None => Filter::new(json!({ "data_description.project_name": DEFAULT_PROJECT }))?,
        };
        let projection = match event.get("projection") {
            Some(value) => Projection::new(value.clone())?,
            None => Projection::include(&[
                "_id",
                "name",
                "location",
                "created",
                "last_modified",
                "data_description",
            ]),
        };
        let limit = event
            .get("limit")
            .and_then(Value::as_u64)
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let records = self
            .store
            .retrieve(&filter, Some(&projection), Some(limit))
            .await?;
        info!(records = records.len(), "Found records from filter");
        Ok(Value::Array(records.into_iter().map(|r| r.into_value()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_table() {
        assert_eq!(DocDbAction::lookup("count"), Some(DocDbAction::Count));
        assert_eq!(DocDbAction::lookup("aggregation"), Some(DocDbAction::Aggregation));
        assert_eq!(DocDbAction::lookup("Count"), None);
        assert_eq!(DocDbAction::lookup(""), None);
    }
}
