//! Serverless-style entry points: decode an event, look the action up in a
//! fixed table, run it against an injected client and wrap the result in the
//! transport envelope the caller expects.

pub mod docdb_handler;
pub mod envelope;
pub mod github_action;
pub mod github_agent;

pub use docdb_handler::{DocDbAction, DocDbHandler, DEFAULT_LIMIT, DEFAULT_PROJECT};
pub use envelope::{AgentEnvelope, AgentResponse, HandlerResponse, HttpEnvelope};
pub use github_action::{GithubAction, GithubActionHandler};
pub use github_agent::{AgentEvent, AgentParameter, AgentRoute, GithubAgentHandler, RouteError};
