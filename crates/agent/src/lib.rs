//! Issue-driven assistants: explore a metadata issue against the record store
//! and report back on the issue, or draft a migration script as a pull request.

pub mod error;
pub mod explorer;
pub mod prompts;
pub mod solver;

pub use error::{AgentError, AgentResult};
pub use explorer::{Exploration, IssueExplorer, SAMPLE_SIZE};
pub use solver::{IssueSolver, ProposedFix};
