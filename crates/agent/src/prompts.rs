//! Fixed prompt templates. Schema context, when configured, is appended to
//! every system prompt.

use serde_json::Value;

const RECORD_LAYOUT: &str = "\
Records in the metadata database are JSON documents. Each has bookkeeping fields \
(_id, name, location, created, last_modified) and top-level sections: acquisition, \
data_description, procedures, processing, quality_control, rig, session, subject. \
Address fields with dotted paths such as \"subject.subject_id\" and never prefix \
them with \"metadata\".";

const QUERY_EXAMPLES: &str = r#"Example filters:
{"subject.subject_id": "731015"}
{"subject.breeding_info.breeding_group": "Slc17a6-IRES-Cre;Ai230-hyg(ND)"}
{"data_description.modality.abbreviation": {"$in": ["ecephys"]}}
{"data_description.funding_source": {"$elemMatch": {"funder": "PGA"}}}"#;

fn with_context(base: String, schema_context: &str) -> String {
    if schema_context.trim().is_empty() {
        base
    } else {
        format!("{}\n\nSchema reference:\n{}", base, schema_context)
    }
}

pub fn issue_content(title: &str, body: &str) -> String {
    format!("Title: {}\nBody: {}", title, body)
}

pub fn query_system(schema_context: &str) -> String {
    with_context(
        format!(
            "You investigate reports of incorrect metadata. {}\n\n{}\n\n\
             Write one plain filter query that selects the records affected by the issue. \
             No projections, aggregations or updates. Answer with a JSON object whose only \
             key is \"query\" and nothing else.",
            RECORD_LAYOUT, QUERY_EXAMPLES
        ),
        schema_context,
    )
}

pub fn retry_system() -> String {
    "The previous filter query matched no records. Produce a simpler one that is more \
     likely to match: fewer conditions, verified field names, simpler operators, broader \
     criteria. Answer with a JSON object whose only key is \"query\" and nothing else."
        .to_string()
}

pub fn retry_user(previous: &Value, issue_content: &str) -> String {
    format!(
        "Original query: {}\nIssue: {}",
        serde_json::to_string_pretty(previous).unwrap_or_else(|_| previous.to_string()),
        issue_content
    )
}

pub fn analysis_system(schema_context: &str) -> String {
    with_context(
        format!(
            "You investigate reports of incorrect metadata. {}\n\n\
             Fixes are applied by a migration tool that needs a filter query, the list of \
             top-level sections it may modify and a callback that takes one record and \
             returns it repaired. Using the issue and the sample records, explain:\n\
             1. how many records are affected\n\
             2. what exactly is wrong in them\n\
             3. the filter query that selects them\n\
             4. which sections are affected\n\
             5. what the callback should do\n\
             6. risks to watch for",
            RECORD_LAYOUT
        ),
        schema_context,
    )
}

pub fn analysis_user(issue_content: &str, total: u64, samples: &[Value]) -> String {
    format!(
        "Issue: {}\n\nNumber of records: {}\n\nSample records (at most {}): {}",
        issue_content,
        total,
        crate::explorer::SAMPLE_SIZE,
        Value::Array(samples.to_vec())
    )
}

pub fn solver_system(schema_context: &str) -> String {
    with_context(
        format!(
            "You repair incorrect metadata by writing a migration script. {}\n\n\
             The script selects records with a filter query, declares the only top-level \
             sections it modifies, and supplies an idempotent callback that takes one \
             record and returns it repaired. It must support --dev, --full-run and --test \
             flags, always run a dry run first and only commit with --full-run. Return only \
             the contents of run.py.",
            RECORD_LAYOUT
        ),
        schema_context,
    )
}
