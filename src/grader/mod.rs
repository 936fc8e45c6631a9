mod openai_compat;
mod types;

pub use openai_compat::{parse_chat_response, GradingClient, REASONING_HEADER};

use async_trait::async_trait;
use essay_grader_common::Grading;

#[async_trait]
pub trait Grader: Send + Sync {
    /// Never fails; errors come back as [`Grading::failed`].
    async fn grade(&self, prompt: &str) -> Grading;
}
