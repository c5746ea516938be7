use crate::error::{AgentError, AgentResult};
use crate::prompts;
use docdb::{Filter, Record, RecordStore};
use github::{Issue, IssueTracker};
use llm::{extract_json, InferenceProvider, InferenceRequest};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Records shown to the model for analysis
pub const SAMPLE_SIZE: usize = 5;

/// What exploring one issue produced
#[derive(Debug, Clone, Serialize)]
pub struct Exploration {
    pub issue: u64,
    pub query: Value,
    pub retried: bool,
    pub total: u64,
    pub samples: Vec<Value>,
    pub analysis: String,
}

/// Turns an issue into a filter query, samples the matching records, and posts
/// the model's analysis back on the issue
pub struct IssueExplorer {
    llm: Arc<dyn InferenceProvider>,
    store: Arc<dyn RecordStore>,
    tracker: Arc<dyn IssueTracker>,
    schema_context: String,
    max_tokens: u32,
    post_comments: bool,
}

impl IssueExplorer {
    pub fn new(
        llm: Arc<dyn InferenceProvider>,
        store: Arc<dyn RecordStore>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        Self {
            llm,
            store,
            tracker,
            schema_context: String::new(),
            max_tokens: 4096,
            post_comments: true,
        }
    }

    pub fn with_schema_context(mut self, context: impl Into<String>) -> Self {
        self.schema_context = context.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Keep analyses local instead of commenting on the issue
    pub fn without_comments(mut self) -> Self {
        self.post_comments = false;
        self
    }

    async fn ask_for_query(&self, request: InferenceRequest) -> AgentResult<(Value, Filter)> {
        let response = self
            .llm
            .complete(request.with_parameters(Some(self.max_tokens), None))
            .await?;
        let parsed = extract_json(&response.content)?;
        let query = parsed
            .get("query")
            .cloned()
            .ok_or_else(|| AgentError::InvalidQuery("missing \"query\" key".to_string()))?;
        let filter =
            Filter::new(query.clone()).map_err(|e| AgentError::InvalidQuery(e.to_string()))?;
        Ok((query, filter))
    }

    /// First attempt; any unusable answer counts as a miss and leads to the retry
    async fn first_query(&self, content: &str) -> Option<(Value, Filter, u64)> {
        let request = InferenceRequest::new(content)
            .with_system_prompt(prompts::query_system(&self.schema_context));
        let (query, filter) = match self.ask_for_query(request).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "First query attempt unusable");
                return None;
            }
        };
        match self.store.count(&filter).await {
            Ok(total) => Some((query, filter, total)),
            Err(e) => {
                warn!(error = %e, query = %query, "First query failed against the store");
                None
            }
        }
    }

    pub async fn explore(&self, issue: &Issue) -> AgentResult<Exploration> {
        info!(issue = issue.number, title = %issue.title, "Exploring issue");
        let content = prompts::issue_content(&issue.title, issue.body_text());

        let mut retried = false;
        let (query, filter, total) = match self.first_query(&content).await {
            Some(found) if found.2 > 0 => found,
            first => {
                let previous = first.map(|(q, _, _)| q).unwrap_or(Value::Null);
                info!(issue = issue.number, "No results, retrying with a simplified query");
                retried = true;
                let request = InferenceRequest::new(prompts::retry_user(&previous, &content))
                    .with_system_prompt(prompts::retry_system());
                let (query, filter) = self.ask_for_query(request).await?;
                let total = self.store.count(&filter).await?;
                if total == 0 {
                    warn!(issue = issue.number, "Still no results after retry");
                    return Err(AgentError::NoMatchingRecords {
                        issue: issue.number,
                    });
                }
                (query, filter, total)
            }
        };
        info!(issue = issue.number, total, query = %query, "Query matched records");

        let samples: Vec<Value> = self
            .store
            .retrieve(&filter, None, Some(SAMPLE_SIZE))
            .await?
            .into_iter()
            .take(SAMPLE_SIZE)
            .map(Record::into_value)
            .collect();

        let analysis = self
            .llm
            .complete(
                InferenceRequest::new(prompts::analysis_user(&content, total, &samples))
                    .with_system_prompt(prompts::analysis_system(&self.schema_context))
                    .with_parameters(Some(self.max_tokens), None),
            )
            .await?
            .content;

        if self.post_comments {
            self.tracker.post_comment(issue.number, &analysis).await?;
            info!(issue = issue.number, "Posted analysis");
        }

        Ok(Exploration {
            issue: issue.number,
            query,
            retried,
            total,
            samples,
            analysis,
        })
    }

    /// Explore one issue by number, or every open issue on the first page
    pub async fn run(&self, issue: Option<u64>) -> AgentResult<Vec<Exploration>> {
        let issues = match issue {
            Some(number) => vec![self.tracker.get_issue(number).await?],
            None => self.tracker.list_open_issues().await?,
        };
        let mut results = Vec::with_capacity(issues.len());
        for issue in &issues {
            results.push(self.explore(issue).await?);
        }
        Ok(results)
    }
}
