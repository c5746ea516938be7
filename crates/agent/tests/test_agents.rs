use agent::{AgentError, IssueExplorer, IssueSolver};
use docdb::{InMemoryStore, Record};
use github::{InMemoryTracker, Issue, RepoId};
use llm::MockProvider;
use serde_json::json;
use std::sync::Arc;

fn store() -> Arc<InMemoryStore> {
    let records = (0..8)
        .map(|i| {
            Record::from_value(json!({
                "_id": format!("rec-{}", i),
                "name": format!("SmartSPIM_{}", i),
                "data_description": {"project_name": "Thalamus in the middle"},
                "acquisition": {"tiles": [{"channel": {"channel_name": "488.0"}}]},
            }))
            .unwrap()
        })
        .collect();
    Arc::new(InMemoryStore::with_records("docdb", records).unwrap())
}

async fn tracker() -> Arc<InMemoryTracker> {
    let tracker = Arc::new(InMemoryTracker::new(
        RepoId::parse("AllenNeuralDynamics/aind-scicomp-nautilex").unwrap(),
    ));
    tracker
        .add_issue(Issue::new(
            3,
            "Channel names stored as floats",
            "Thalamus in the middle tiles have channel_name 488.0",
        ))
        .await;
    tracker
}

#[tokio::test]
async fn test_explore_posts_analysis_with_truncated_samples() {
    let llm = Arc::new(MockProvider::new([
        r#"{"query": {"data_description.project_name": "Thalamus in the middle"}}"#,
        "Eight records are affected.",
    ]));
    let tracker = tracker().await;
    let explorer = IssueExplorer::new(llm.clone(), store(), tracker.clone());

    let results = explorer.run(Some(3)).await.unwrap();

    assert_eq!(results.len(), 1);
    let exploration = &results[0];
    assert!(!exploration.retried);
    assert_eq!(exploration.total, 8);
    assert_eq!(exploration.samples.len(), 5);
    assert_eq!(
        tracker.comments().await,
        vec![(3, "Eight records are affected.".to_string())]
    );

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains("Number of records: 8"));
}

#[tokio::test]
async fn test_explore_retries_once_with_simplified_query() {
    let llm = Arc::new(MockProvider::new([
        r#"{"query": {"data_description.project_name": "Thalamus"}}"#,
        "```json\n{\"query\": {\"name\": {\"$regex\": \"^SmartSPIM\"}}}\n```",
        "analysis",
    ]));
    let explorer = IssueExplorer::new(llm.clone(), store(), tracker().await).without_comments();

    let results = explorer.run(Some(3)).await.unwrap();
    assert!(results[0].retried);
    assert_eq!(results[0].query, json!({"name": {"$regex": "^SmartSPIM"}}));

    let requests = llm.requests().await;
    assert!(requests[1].prompt.contains("Original query"));
    assert!(requests[1].prompt.contains("\"Thalamus\""));
}

#[tokio::test]
async fn test_explore_gives_up_after_second_empty_query() {
    let llm = Arc::new(MockProvider::new([
        r#"{"query": {"subject.subject_id": "nope"}}"#,
        r#"{"query": {"subject.subject_id": "still nope"}}"#,
    ]));
    let tracker = tracker().await;
    let explorer = IssueExplorer::new(llm.clone(), store(), tracker.clone());

    let err = explorer.run(Some(3)).await.unwrap_err();
    assert!(matches!(err, AgentError::NoMatchingRecords { issue: 3 }));
    assert_eq!(llm.requests().await.len(), 2);
    assert!(tracker.comments().await.is_empty());
}

#[tokio::test]
async fn test_unusable_first_answer_also_triggers_the_retry() {
    let llm = Arc::new(MockProvider::new([
        "I am not sure what to query.",
        r#"{"query": {"name": "SmartSPIM_0"}}"#,
        "analysis",
    ]));
    let explorer = IssueExplorer::new(llm, store(), tracker().await).without_comments();

    let results = explorer.run(Some(3)).await.unwrap();
    assert!(results[0].retried);
    assert_eq!(results[0].total, 1);
}

#[tokio::test]
async fn test_solver_opens_pull_request_with_script() {
    let llm = Arc::new(MockProvider::new([
        "```python\nfrom migrate import run\nprint('fix')\n```",
    ]));
    let tracker = tracker().await;
    let solver = IssueSolver::new(llm, tracker.clone()).with_clock(|| "2025-02-23T12-47-45.210627".to_string());

    let fixes = solver.run(Some(3)).await.unwrap();
    let fix = &fixes[0];

    assert_eq!(fix.branch, "fix/issue-3-2025-02-23T12-47-45.210627");
    assert_eq!(fix.path, "scripts/2025-02-23T12-47-45.210627/run.py");
    assert_eq!(fix.pull_request.title, "Fix for issue #3");
    assert_eq!(fix.pull_request.body.as_deref(), Some("Resolves #3"));

    let files = tracker.files().await;
    assert_eq!(files[0].content, "from migrate import run\nprint('fix')");
    assert_eq!(files[0].branch, fix.branch);
}

#[tokio::test]
async fn test_solver_rejects_empty_script() {
    let llm = Arc::new(MockProvider::new(["```python\n```"]));
    let tracker = tracker().await;
    let solver = IssueSolver::new(llm, tracker.clone());

    assert!(matches!(
        solver.run(Some(3)).await,
        Err(AgentError::EmptyScript { issue: 3 })
    ));
    assert!(tracker.pull_requests().await.is_empty());
}
