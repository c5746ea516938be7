use anyhow::{bail, Result};
use docdb::Record;
use serde_json::{json, Value};

/// Acquisition modalities known to the metadata schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Behavior,
    BehaviorVideos,
    Confocal,
    Ecephys,
    Emg,
    Fib,
    Fmost,
    Icephys,
    Isi,
    Mri,
    Merfish,
    Pophys,
    Slap,
    Spim,
}

impl Modality {
    pub const ALL: [Modality; 14] = [
        Modality::Behavior,
        Modality::BehaviorVideos,
        Modality::Confocal,
        Modality::Ecephys,
        Modality::Emg,
        Modality::Fib,
        Modality::Fmost,
        Modality::Icephys,
        Modality::Isi,
        Modality::Mri,
        Modality::Merfish,
        Modality::Pophys,
        Modality::Slap,
        Modality::Spim,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            Modality::Behavior => "behavior",
            Modality::BehaviorVideos => "behavior-videos",
            Modality::Confocal => "confocal",
            Modality::Ecephys => "ecephys",
            Modality::Emg => "EMG",
            Modality::Fib => "fib",
            Modality::Fmost => "fMOST",
            Modality::Icephys => "icephys",
            Modality::Isi => "ISI",
            Modality::Mri => "MRI",
            Modality::Merfish => "merfish",
            Modality::Pophys => "pophys",
            Modality::Slap => "slap",
            Modality::Spim => "SPIM",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Modality::Behavior => "Behavior",
            Modality::BehaviorVideos => "Behavior videos",
            Modality::Confocal => "Confocal microscopy",
            Modality::Ecephys => "Extracellular electrophysiology",
            Modality::Emg => "Electromyography",
            Modality::Fib => "Fiber photometry",
            Modality::Fmost => "Fluorescence micro-optical sectioning tomography",
            Modality::Icephys => "Intracellular electrophysiology",
            Modality::Isi => "Intrinsic signal imaging",
            Modality::Mri => "Magnetic resonance imaging",
            Modality::Merfish => "Multiplexed error-robust fluorescence in situ hybridization",
            Modality::Pophys => "Planar optical physiology",
            Modality::Slap => "Scanned line projection imaging",
            Modality::Spim => "Selective plane illumination microscopy",
        }
    }

    /// Accepts the abbreviation in any case, or the enum-style key (`BEHAVIOR_VIDEOS`)
    pub fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|m| m.abbreviation().to_ascii_lowercase() == needle)
    }

    pub fn to_value(self) -> Value {
        json!({"name": self.display_name(), "abbreviation": self.abbreviation()})
    }
}

fn coerce(value: &Value) -> Result<Option<Value>> {
    let items: Vec<&Value> = match value {
        Value::String(_) => vec![value],
        Value::Array(items) => items.iter().collect(),
        _ => return Ok(None),
    };

    let mut changed = !value.is_array();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(raw) => {
                let modality = Modality::parse(raw)
                    .ok_or_else(|| anyhow::anyhow!("unknown modality '{}'", raw))?;
                out.push(modality.to_value());
                changed = true;
            }
            Value::Object(_) => out.push(item.clone()),
            other => bail!("unexpected modality entry {}", other),
        }
    }
    Ok(changed.then_some(Value::Array(out)))
}

/// Modality stored as a bare string becomes a list of modality objects
pub fn fix_modality_type(mut record: Record) -> Result<Record> {
    if let Some(metadata) = record.section_mut("metadata") {
        if let Some(modality) = metadata.get_mut("modality") {
            if let Some(fixed) = coerce(modality)? {
                *modality = fixed;
            }
            return Ok(record);
        }
    }
    if let Some(modality) = record.section_mut("modality") {
        if let Some(fixed) = coerce(modality)? {
            *modality = fixed;
        }
    }
    Ok(record)
}
