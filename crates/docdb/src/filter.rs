//! Filter and projection expressions.
//!
//! The remote API evaluates filters itself; the local evaluator here backs
//! [`crate::InMemoryStore`] and the pre-flight validation done before a filter
//! is sent anywhere. Semantics follow the document database: a path crossing
//! an array matches when any element matches.

use crate::error::{DocDbError, DocDbResult};
use crate::record::{type_name, Record};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

const FIELD_OPERATORS: &[&str] = &[
    "$eq",
    "$ne",
    "$in",
    "$nin",
    "$exists",
    "$regex",
    "$options",
    "$gt",
    "$gte",
    "$lt",
    "$lte",
    "$elemMatch",
    "$size",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// Parse and validate a filter expression
    pub fn new(value: Value) -> DocDbResult<Self> {
        match value {
            Value::Object(map) => {
                let filter = Self(map);
                filter.validate()?;
                Ok(filter)
            }
            other => Err(DocDbError::InvalidFilter(format!(
                "filter must be an object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Matches every record
    pub fn all() -> Self {
        Self(Map::new())
    }

    /// `{"_id": {"$in": ids}}`
    pub fn by_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let ids: Vec<Value> = ids
            .iter()
            .map(|id| Value::String(id.as_ref().to_string()))
            .collect();
        let mut inner = Map::new();
        inner.insert("$in".to_string(), Value::Array(ids));
        let mut map = Map::new();
        map.insert("_id".to_string(), Value::Object(inner));
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn validate(&self) -> DocDbResult<()> {
        validate_document(&self.0)
    }

    pub fn matches(&self, record: &Record) -> DocDbResult<bool> {
        match_document(&self.0, record.as_map())
    }
}

fn validate_document(doc: &Map<String, Value>) -> DocDbResult<()> {
    for (key, cond) in doc {
        match key.as_str() {
            "$and" | "$or" => {
                let clauses = cond.as_array().ok_or_else(|| {
                    DocDbError::InvalidFilter(format!("{} expects an array", key))
                })?;
                for clause in clauses {
                    let clause = clause.as_object().ok_or_else(|| {
                        DocDbError::InvalidFilter(format!("{} clauses must be objects", key))
                    })?;
                    validate_document(clause)?;
                }
            }
            k if k.starts_with('$') => {
                return Err(DocDbError::InvalidFilter(format!(
                    "unsupported top-level operator {}",
                    k
                )));
            }
            _ => validate_condition(cond)?,
        }
    }
    Ok(())
}

fn validate_condition(cond: &Value) -> DocDbResult<()> {
    let Some(ops) = operator_map(cond) else {
        return Ok(());
    };
    for (op, arg) in ops {
        if !FIELD_OPERATORS.contains(&op.as_str()) {
            return Err(DocDbError::InvalidFilter(format!(
                "unsupported operator {}",
                op
            )));
        }
        match op.as_str() {
            "$in" | "$nin" if !arg.is_array() => {
                return Err(DocDbError::InvalidFilter(format!("{} expects an array", op)));
            }
            "$regex" => {
                let pattern = arg.as_str().ok_or_else(|| {
                    DocDbError::InvalidFilter("$regex expects a string".to_string())
                })?;
                build_regex(pattern, ops.get("$options"))?;
            }
            "$elemMatch" => {
                let sub = arg.as_object().ok_or_else(|| {
                    DocDbError::InvalidFilter("$elemMatch expects an object".to_string())
                })?;
                if operator_map(arg).is_some() {
                    validate_condition(arg)?;
                } else {
                    validate_document(sub)?;
                }
            }
            "$size" if arg.as_u64().is_none() => {
                return Err(DocDbError::InvalidFilter(
                    "$size expects a non-negative integer".to_string(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Some(map) when `cond` is a non-empty object whose keys are all operators
fn operator_map(cond: &Value) -> Option<&Map<String, Value>> {
    let map = cond.as_object()?;
    if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) {
        Some(map)
    } else {
        None
    }
}

fn match_document(filter: &Map<String, Value>, doc: &Map<String, Value>) -> DocDbResult<bool> {
    for (key, cond) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, cond)? {
                    if !match_document(clause, doc)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, cond)? {
                    if match_document(clause, doc)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            k if k.starts_with('$') => {
                return Err(DocDbError::InvalidFilter(format!(
                    "unsupported top-level operator {}",
                    k
                )));
            }
            path => {
                let segments: Vec<&str> = path.split('.').collect();
                let mut candidates = Vec::new();
                if let Some(first) = doc.get(segments[0]) {
                    collect_path(first, &segments[1..], &mut candidates);
                }
                match_condition(cond, &candidates)?
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(key: &str, cond: &'a Value) -> DocDbResult<Vec<&'a Map<String, Value>>> {
    cond.as_array()
        .ok_or_else(|| DocDbError::InvalidFilter(format!("{} expects an array", key)))?
        .iter()
        .map(|c| {
            c.as_object()
                .ok_or_else(|| DocDbError::InvalidFilter(format!("{} clauses must be objects", key)))
        })
        .collect()
}

fn collect_path<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*head) {
                collect_path(next, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    collect_path(item, rest, out);
                }
            }
            for item in items.iter().filter(|i| i.is_object()) {
                collect_path(item, segments, out);
            }
        }
        _ => {}
    }
}

fn match_condition(cond: &Value, candidates: &[&Value]) -> DocDbResult<bool> {
    let Some(ops) = operator_map(cond) else {
        return Ok(equals_any(cond, candidates));
    };

    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$eq" => equals_any(arg, candidates),
            "$ne" => !equals_any(arg, candidates),
            "$in" => in_list(arg, candidates)?,
            "$nin" => !in_list(arg, candidates)?,
            "$exists" => {
                let wanted = arg.as_bool().unwrap_or(true);
                candidates.is_empty() != wanted
            }
            "$regex" => {
                let pattern = arg.as_str().ok_or_else(|| {
                    DocDbError::InvalidFilter("$regex expects a string".to_string())
                })?;
                let re = build_regex(pattern, ops.get("$options"))?;
                candidates.iter().any(|c| match c {
                    Value::String(s) => re.is_match(s),
                    Value::Array(items) => items
                        .iter()
                        .any(|i| i.as_str().map(|s| re.is_match(s)).unwrap_or(false)),
                    _ => false,
                })
            }
            // consumed together with $regex
            "$options" => true,
            "$gt" => compare_any(arg, candidates, |o| o == Ordering::Greater),
            "$gte" => compare_any(arg, candidates, |o| o != Ordering::Less),
            "$lt" => compare_any(arg, candidates, |o| o == Ordering::Less),
            "$lte" => compare_any(arg, candidates, |o| o != Ordering::Greater),
            "$size" => {
                let size = arg.as_u64().ok_or_else(|| {
                    DocDbError::InvalidFilter("$size expects a non-negative integer".to_string())
                })? as usize;
                candidates
                    .iter()
                    .any(|c| c.as_array().map(|a| a.len() == size).unwrap_or(false))
            }
            "$elemMatch" => elem_match(arg, candidates)?,
            other => {
                return Err(DocDbError::InvalidFilter(format!(
                    "unsupported operator {}",
                    other
                )));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn equals_any(expected: &Value, candidates: &[&Value]) -> bool {
    if expected.is_null() && candidates.is_empty() {
        return true;
    }
    candidates.iter().any(|c| {
        *c == expected
            || c.as_array()
                .map(|items| items.iter().any(|i| i == expected))
                .unwrap_or(false)
    })
}

fn in_list(list: &Value, candidates: &[&Value]) -> DocDbResult<bool> {
    let list = list
        .as_array()
        .ok_or_else(|| DocDbError::InvalidFilter("$in expects an array".to_string()))?;
    Ok(list.iter().any(|v| equals_any(v, candidates)))
}

fn compare_any(bound: &Value, candidates: &[&Value], accept: impl Fn(Ordering) -> bool) -> bool {
    candidates
        .iter()
        .filter_map(|c| compare_values(c, bound))
        .any(accept)
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn elem_match(sub: &Value, candidates: &[&Value]) -> DocDbResult<bool> {
    for candidate in candidates {
        let Some(items) = candidate.as_array() else {
            continue;
        };
        for item in items {
            let matched = if operator_map(sub).is_some() {
                match_condition(sub, &[item])?
            } else {
                match (sub.as_object(), item.as_object()) {
                    (Some(query), Some(doc)) => match_document(query, doc)?,
                    _ => false,
                }
            };
            if matched {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn build_regex(pattern: &str, options: Option<&Value>) -> DocDbResult<regex::Regex> {
    let options = options.and_then(Value::as_str).unwrap_or("");
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .build()
        .map_err(|e| DocDbError::InvalidFilter(format!("bad $regex {}: {}", pattern, e)))
}

/// Field projection, either all-inclusive or all-exclusive (`_id` may differ)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Projection(Map<String, Value>);

impl Projection {
    pub fn new(value: Value) -> DocDbResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DocDbError::InvalidProjection(format!(
                    "projection must be an object, got {}",
                    type_name(&other)
                )))
            }
        };
        let projection = Self(map);
        projection.mode()?;
        Ok(projection)
    }

    /// Inclusion projection over the given fields
    pub fn include<S: AsRef<str>>(fields: &[S]) -> Self {
        Self(
            fields
                .iter()
                .map(|f| (f.as_ref().to_string(), Value::from(1)))
                .collect(),
        )
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// true = inclusion, false = exclusion
    fn mode(&self) -> DocDbResult<bool> {
        let mut mode = None;
        for (field, flag) in &self.0 {
            let include = flag_value(field, flag)?;
            if field == "_id" {
                continue;
            }
            match mode {
                None => mode = Some(include),
                Some(m) if m != include => {
                    return Err(DocDbError::InvalidProjection(
                        "cannot mix inclusion and exclusion".to_string(),
                    ))
                }
                _ => {}
            }
        }
        // only `_id` given: treat as inclusion when it is 1
        Ok(mode.unwrap_or_else(|| {
            self.0
                .get("_id")
                .map(|f| flag_value("_id", f).unwrap_or(true))
                .unwrap_or(false)
        }))
    }

    pub fn apply(&self, record: &Record) -> DocDbResult<Record> {
        let inclusive = self.mode()?;
        let keep_id = match self.0.get("_id") {
            Some(flag) => flag_value("_id", flag)?,
            None => true,
        };
        let source = record.as_map();

        let mut out = if inclusive {
            let mut out = Map::new();
            for field in self.0.keys().filter(|f| f.as_str() != "_id") {
                copy_path(source, &mut out, &field.split('.').collect::<Vec<_>>());
            }
            out
        } else {
            let mut out = source.clone();
            for field in self.0.keys().filter(|f| f.as_str() != "_id") {
                remove_path(&mut out, &field.split('.').collect::<Vec<_>>());
            }
            out
        };

        if keep_id {
            if let Some(id) = source.get("_id") {
                out.insert("_id".to_string(), id.clone());
            }
        } else {
            out.remove("_id");
        }
        Ok(Record::from(out))
    }
}

fn flag_value(field: &str, flag: &Value) -> DocDbResult<bool> {
    match flag {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
        _ => Err(DocDbError::InvalidProjection(format!(
            "field {} must be 0/1 or a boolean",
            field
        ))),
    }
}

fn copy_path(source: &Map<String, Value>, out: &mut Map<String, Value>, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };
    if rest.is_empty() {
        out.insert(head.to_string(), value.clone());
        return;
    }
    if let Value::Object(child) = value {
        let entry = out
            .entry(head.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(target) = entry {
            copy_path(child, target, rest);
        }
    }
}

fn remove_path(map: &mut Map<String, Value>, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            map.remove(*last);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = map.get_mut(*head) {
                remove_path(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn thalamus() -> Record {
        record(json!({
            "_id": "r1",
            "name": "SmartSPIM_123",
            "data_description": {
                "project_name": "Thalamus in the middle",
                "modality": [{"abbreviation": "SPIM"}],
                "funding_source": [{"funder": "NINDS"}, {"funder": "PGA"}],
            },
            "acquisition": {
                "tiles": [
                    {"channel": {"channel_name": "488.0"}},
                    {"channel": {"channel_name": "561"}},
                ],
                "experimenter_full_name": "Jane Doe",
            },
            "subject": {"subject_id": "731015"},
        }))
    }

    fn matches(filter: Value) -> bool {
        Filter::new(filter).unwrap().matches(&thalamus()).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::all().matches(&thalamus()).unwrap());
    }

    #[test]
    fn test_equality_on_nested_path() {
        assert!(matches(json!({"subject.subject_id": "731015"})));
        assert!(!matches(json!({"subject.subject_id": "000000"})));
        assert!(matches(
            json!({"data_description.project_name": "Thalamus in the middle"})
        ));
    }

    #[test]
    fn test_path_through_array() {
        assert!(matches(json!({"data_description.modality.abbreviation": {"$in": ["ecephys", "SPIM"]}})));
        assert!(matches(json!({"acquisition.tiles.channel.channel_name": "561"})));
        assert!(matches(json!({"acquisition.tiles.0.channel.channel_name": "488.0"})));
    }

    #[test]
    fn test_regex_and_combinators() {
        assert!(matches(json!({
            "$and": [
                {"acquisition.tiles.channel.channel_name": {"$regex": "^[0-9]+[.]0$"}},
                {"acquisition.tiles.channel.channel_name": {"$regex": "^[0-9]+$"}},
            ]
        })));
        assert!(matches(json!({
            "$or": [
                {"name": {"$regex": "^ecephys"}},
                {"name": {"$regex": "^smartspim", "$options": "i"}},
            ]
        })));
        assert!(!matches(json!({"name": {"$regex": "^smartspim"}})));
    }

    #[test]
    fn test_elem_match() {
        assert!(matches(json!({
            "data_description.funding_source": {"$elemMatch": {"funder": "PGA"}}
        })));
        assert!(!matches(json!({
            "data_description.funding_source": {"$elemMatch": {"funder": "NIMH"}}
        })));
    }

    #[test]
    fn test_exists_ne_nin_size() {
        assert!(matches(json!({"rig": {"$exists": false}})));
        assert!(matches(json!({"subject": {"$exists": true}})));
        assert!(matches(json!({"name": {"$ne": "other"}})));
        assert!(matches(json!({"_id": {"$nin": ["r2", "r3"]}})));
        assert!(matches(json!({"acquisition.tiles": {"$size": 2}})));
    }

    #[test]
    fn test_by_ids() {
        let filter = Filter::by_ids(&["r1", "r9"]);
        assert!(filter.matches(&thalamus()).unwrap());
        assert_eq!(filter.to_json(), r#"{"_id":{"$in":["r1","r9"]}}"#);
    }

    #[test]
    fn test_invalid_filters_are_rejected() {
        assert!(Filter::new(json!("not an object")).is_err());
        assert!(Filter::new(json!({"name": {"$where": "1"}})).is_err());
        assert!(Filter::new(json!({"$nor": []})).is_err());
        assert!(Filter::new(json!({"name": {"$regex": "("}})).is_err());
        assert!(Filter::new(json!({"_id": {"$in": "r1"}})).is_err());
    }

    #[test]
    fn test_inclusion_projection() {
        let projection = Projection::new(json!({
            "_id": 1,
            "name": 1,
            "data_description.project_name": 1,
        }))
        .unwrap();
        let projected = projection.apply(&thalamus()).unwrap();
        assert_eq!(
            projected.into_value(),
            json!({
                "name": "SmartSPIM_123",
                "data_description": {"project_name": "Thalamus in the middle"},
                "_id": "r1",
            })
        );
    }

    #[test]
    fn test_exclusion_projection_and_hidden_id() {
        let projection = Projection::new(json!({"_id": 0, "acquisition": 0})).unwrap();
        let projected = projection.apply(&thalamus()).unwrap();
        assert!(projected.id().is_none());
        assert!(projected.section("acquisition").is_none());
        assert!(projected.section("subject").is_some());
    }

    #[test]
    fn test_mixed_projection_is_rejected() {
        assert!(Projection::new(json!({"name": 1, "subject": 0})).is_err());
    }
}
