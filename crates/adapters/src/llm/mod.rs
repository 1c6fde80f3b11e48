//! LLM provider adapters

pub mod openai;
pub mod stub;
pub mod vision;

pub use openai::OpenAiChatModel;
pub use stub::{StubChatModel, StubVisionModel};
pub use vision::OpenAiVisionModel;

use serde::{Deserialize, Serialize};

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            retries: 2,
        }
    }
}
