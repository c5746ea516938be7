use anyhow::Result;
use docdb::Record;
use regex::Regex;
use serde_json::Value;

/// Project whose tile channel names were exported with a decimal suffix
pub const AFFECTED_PROJECT: &str = "Thalamus in the middle";

fn in_affected_project(record: &Record) -> bool {
    record
        .get_path("data_description.project_name")
        .and_then(Value::as_str)
        == Some(AFFECTED_PROJECT)
}

fn for_each_channel_name(record: &mut Record, mut f: impl FnMut(&mut Value)) {
    let Some(tiles) = record
        .section_mut("acquisition")
        .and_then(|acq| acq.get_mut("tiles"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for tile in tiles {
        if let Some(name) = tile
            .get_mut("channel")
            .and_then(|channel| channel.get_mut("channel_name"))
        {
            f(name);
        }
    }
}

/// Integer wavelength of a channel name. Empty strings and numeric zero are
/// skipped; a non-empty string such as `"0.0"` still converts.
fn wavelength(value: &Value) -> Option<i64> {
    let number = match value {
        Value::String(s) if !s.is_empty() => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64().filter(|n| *n != 0.0)?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.trunc() as i64)
}

/// `"488.0"` channel names become the integer `488`
pub struct UpdateChannelName {
    decimal: Regex,
}

impl UpdateChannelName {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            decimal: Regex::new(r"^\d+\.\d+$")?,
        })
    }

    pub fn apply(&self, mut record: Record) -> Result<Record> {
        if !in_affected_project(&record) {
            return Ok(record);
        }
        for_each_channel_name(&mut record, |name| {
            let Some(raw) = name.as_str() else { return };
            if !self.decimal.is_match(raw) {
                return;
            }
            if let Some(w) = wavelength(name) {
                *name = Value::from(w);
            }
        });
        Ok(record)
    }
}

/// Any numeric channel name becomes its integer wavelength as a string
pub fn fix_channel_names(mut record: Record) -> Result<Record> {
    if !in_affected_project(&record) {
        return Ok(record);
    }
    for_each_channel_name(&mut record, |name| {
        if let Some(w) = wavelength(name) {
            *name = Value::String(w.to_string());
        }
    });
    Ok(record)
}
