use crate::error::{DocDbError, DocDbResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Section names of the metadata schema
pub const KNOWN_SECTIONS: &[&str] = &[
    "subject",
    "acquisition",
    "data_description",
    "procedures",
    "processing",
    "quality_control",
    "rig",
    "session",
    "instrument",
    "metadata",
];

/// One document of the metadata store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> DocDbResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DocDbError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    /// Like [`Record::id`] but fails for documents without a string `_id`
    pub fn require_id(&self) -> DocDbResult<&str> {
        self.id()
            .ok_or_else(|| DocDbError::InvalidRecord("record has no string _id".to_string()))
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    pub fn set_section(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove_section(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Value at a dotted path, descending through objects only
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = DocDbError;

    fn try_from(value: Value) -> DocDbResult<Self> {
        Record::from_value(value)
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accessors() {
        let mut record = Record::from_value(json!({
            "_id": "abc",
            "data_description": {"project_name": "Thalamus in the middle"},
        }))
        .unwrap();

        assert_eq!(record.id(), Some("abc"));
        assert_eq!(
            record.get_path("data_description.project_name"),
            Some(&json!("Thalamus in the middle"))
        );
        assert!(record.get_path("data_description.missing").is_none());

        record.set_section("acquisition", json!({"tiles": []}));
        assert!(record.section("acquisition").is_some());
        assert_eq!(record.keys().count(), 3);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = Record::from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_require_id() {
        let record = Record::from_value(json!({"_id": 7})).unwrap();
        assert!(record.require_id().is_err());
    }
}
