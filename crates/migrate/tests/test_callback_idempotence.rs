use docdb::Record;
use migrate::callbacks::{
    fix_channel_names, fix_experimenter_full_name, fix_modality_type, Modality, UpdateChannelName,
    AFFECTED_PROJECT,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn channel_name() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u32..2000, 0u32..10).prop_map(|(w, d)| json!(format!("{}.{}", w, d))),
        (0u32..2000).prop_map(|w| json!(w.to_string())),
        (0u32..2000).prop_map(|w| json!(w)),
        "[A-Za-z_]{1,8}".prop_map(Value::String),
        Just(json!("")),
    ]
}

fn tile_record() -> impl Strategy<Value = Record> {
    (prop::collection::vec(channel_name(), 0..6), any::<bool>()).prop_map(|(names, affected)| {
        let tiles: Vec<Value> = names
            .into_iter()
            .map(|n| json!({"channel": {"channel_name": n}}))
            .collect();
        let project = if affected { AFFECTED_PROJECT } else { "Other" };
        Record::from_value(json!({
            "_id": "rec",
            "data_description": {"project_name": project},
            "acquisition": {"tiles": tiles},
        }))
        .unwrap()
    })
}

fn modality_value() -> impl Strategy<Value = Value> {
    let abbreviation = prop::sample::select(Modality::ALL.to_vec()).prop_map(|m| m.abbreviation());
    prop_oneof![
        abbreviation.clone().prop_map(|a| json!(a)),
        prop::collection::vec(abbreviation, 1..3).prop_map(|v| json!(v)),
    ]
}

proptest! {
    #[test]
    fn update_channel_name_is_idempotent(record in tile_record()) {
        let fix = UpdateChannelName::new().unwrap();
        let once = fix.apply(record).unwrap();
        let twice = fix.apply(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn fix_channel_names_is_idempotent(record in tile_record()) {
        let once = fix_channel_names(record).unwrap();
        let twice = fix_channel_names(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn fix_experimenter_full_name_is_idempotent(name in "[A-Za-z ]{0,20}", listed in any::<bool>()) {
        let value = if listed { json!([name]) } else { json!(name) };
        let record = Record::from_value(json!({"_id": "rec", "acquisition": {"experimenter_full_name": value}})).unwrap();
        let once = fix_experimenter_full_name(record).unwrap();
        let twice = fix_experimenter_full_name(once.clone()).unwrap();
        prop_assert!(once.get_path("acquisition.experimenter_full_name").unwrap().is_array());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn fix_modality_type_is_idempotent(modality in modality_value()) {
        let record = Record::from_value(json!({"_id": "rec", "metadata": {"modality": modality}})).unwrap();
        let once = fix_modality_type(record).unwrap();
        let twice = fix_modality_type(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
    }
}
