//! Narrow text-inference interface used by the issue agents.

pub mod error;
pub mod extract;
pub mod providers;

pub use error::{LlmError, LlmResult};
pub use extract::{extract_code, extract_json};
pub use providers::{
    AnthropicProvider, InferenceProvider, InferenceRequest, InferenceResponse, MockProvider,
    TokenUsage,
};
