use anyhow::Result;
use docdb::Record;
use serde_json::Value;

/// `acquisition.experimenter_full_name` stored as a string becomes a one-element list
pub fn fix_experimenter_full_name(mut record: Record) -> Result<Record> {
    if let Some(name) = record
        .section_mut("acquisition")
        .and_then(|acq| acq.get_mut("experimenter_full_name"))
    {
        if let Value::String(single) = name {
            *name = Value::Array(vec![Value::String(std::mem::take(single))]);
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_becomes_list_and_lists_are_kept() {
        let record = Record::from_value(json!({
            "_id": "A",
            "acquisition": {"experimenter_full_name": "Jane Doe", "instrument_id": "SPIM-1"}
        }))
        .unwrap();
        let fixed = fix_experimenter_full_name(record).unwrap();
        assert_eq!(
            fixed.section("acquisition"),
            Some(&json!({"experimenter_full_name": ["Jane Doe"], "instrument_id": "SPIM-1"}))
        );
        assert_eq!(fix_experimenter_full_name(fixed.clone()).unwrap(), fixed);
    }

    #[test]
    fn test_records_without_acquisition_pass_through() {
        let record = Record::from_value(json!({"_id": "A", "subject": {}})).unwrap();
        assert_eq!(fix_experimenter_full_name(record.clone()).unwrap(), record);
    }
}
