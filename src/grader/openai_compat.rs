//! Chat-completion client for DeepSeek and OpenAI
//!
//! Both expose the same `/chat/completions` shape; only base URL and model
//! differ. [`GradingClient::grade`] swallows every failure into the
//! [`AI_FAILED`](essay_grader_common::AI_FAILED) sentinel.

use super::types::{ApiErrorBody, ChatMessage, ChatRequest, ChatResponse};
use super::Grader;
use crate::ai_provider::AiProvider;
use crate::config::Settings;
use crate::error::{GraderError, Result};
use async_trait::async_trait;
use essay_grader_common::{Grading, API_TEST_PROMPT, SYSTEM_PROMPT};
use tracing::{error, info};

/// Separates the answer from deepseek-reasoner's chain of thought.
pub const REASONING_HEADER: &str = "\n\n[Reasoning]\n";

#[derive(Debug, Clone)]
pub struct GradingClient {
    http: reqwest::Client,
    provider: AiProvider,
    api_key: String,
    deep_think: bool,
    base_url: String,
}

impl GradingClient {
    pub fn new(provider: AiProvider, api_key: impl Into<String>, deep_think: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider,
            api_key: api_key.into(),
            deep_think,
            base_url: provider.base_url().to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let key = settings
            .effective_api_key()
            .ok_or_else(|| GraderError::Config("API key is not set".into()))?;
        Ok(Self::new(settings.api.provider, key, settings.api.deep_think))
    }

    /// Point at another OpenAI-compatible endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn provider(&self) -> AiProvider {
        self.provider
    }

    pub fn model(&self) -> &'static str {
        self.provider.model(self.deep_think)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: self.model(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        }
    }

    async fn try_grade(&self, prompt: &str) -> Result<Grading> {
        let request = self.build_request(prompt);
        info!("[{:?}] request: {:?}", self.provider, request.messages);

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(GraderError::Api(format!("{status}: {detail}")));
        }

        let grading = parse_chat_response(&body)?;
        info!("[{:?}] response: {:?}", self.provider, grading.text);
        if let Some(usage) = &grading.usage {
            info!("[{:?}] usage: {:?}", self.provider, usage);
        }
        Ok(grading)
    }

    /// `Ok(preview)` when the provider answered, `Err(reason)` otherwise.
    pub async fn test_connection(&self) -> std::result::Result<String, String> {
        let grading = self.grade(API_TEST_PROMPT).await;
        if grading.is_failed() {
            Err("API test failed; check the API key and network.".to_string())
        } else {
            Ok(grading.preview(100))
        }
    }

    /// [`test_connection`](Self::test_connection) for callers without a runtime.
    pub fn test_connection_blocking(&self) -> std::result::Result<String, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("runtime: {e}"))?;
        runtime.block_on(self.test_connection())
    }
}

#[async_trait]
impl Grader for GradingClient {
    async fn grade(&self, prompt: &str) -> Grading {
        match self.try_grade(prompt).await {
            Ok(grading) => grading,
            Err(err) => {
                error!("[{:?}] grading failed: {err}", self.provider);
                Grading::failed()
            }
        }
    }
}

/// Response body to [`Grading`]; reasoning, if any, is appended after
/// [`REASONING_HEADER`].
pub fn parse_chat_response(body: &str) -> Result<Grading> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let usage = response.usage.map(Into::into);
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GraderError::Api("response has no choices".into()))?
        .message;

    let content = message.content.unwrap_or_default();
    let text = match message.reasoning_content.filter(|r| !r.is_empty()) {
        Some(reasoning) => {
            info!("reasoning: {:?}", reasoning);
            format!("{content}{REASONING_HEADER}{reasoning}")
        }
        None => content,
    };
    Ok(Grading::new(text, usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use essay_grader_common::TokenUsage;

    #[test]
    fn test_parse_plain_response() {
        let body = r#"{
            "id": "x",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "<score>18分</score>"}}],
            "usage": {"prompt_tokens": 812, "completion_tokens": 9, "total_tokens": 821}
        }"#;
        let grading = parse_chat_response(body).unwrap();
        assert_eq!(grading.text, "<score>18分</score>");
        assert_eq!(grading.usage, Some(TokenUsage::new(812, 9)));
    }

    #[test]
    fn test_parse_reasoning_appended() {
        let body = r#"{
            "choices": [{"message": {"content": "<score>12分</score>", "reasoning_content": "Vocabulary is limited."}}]
        }"#;
        let grading = parse_chat_response(body).unwrap();
        assert_eq!(
            grading.text,
            "<score>12分</score>\n\n[Reasoning]\nVocabulary is limited."
        );
        assert!(grading.usage.is_none());
    }

    #[test]
    fn test_parse_no_choices_is_error() {
        assert!(parse_chat_response(r#"{"choices": []}"#).is_err());
        assert!(parse_chat_response("not json").is_err());
    }

    #[test]
    fn test_request_shape() {
        let client = GradingClient::new(AiProvider::Deepseek, "sk-test", false);
        let request = client.build_request("essay");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(json["messages"][1]["content"], "essay");
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = GradingClient::new(AiProvider::ChatGpt, "k", false);
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        let client = client.with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_from_settings_requires_key() {
        let mut settings = Settings::default();
        // provider env var may be set on the machine; only assert the stored-key path
        if std::env::var(settings.api.provider.api_key_env()).is_err() {
            assert!(GradingClient::from_settings(&settings).is_err());
        }
        settings.api.key = "sk-abc".into();
        assert!(GradingClient::from_settings(&settings).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_returns_sentinel() {
        let client = GradingClient::new(AiProvider::Deepseek, "sk-test", true)
            .with_base_url("http://127.0.0.1:9");
        let grading = client.grade("essay").await;
        assert!(grading.is_failed());
        assert!(grading.usage.is_none());
        assert!(client.test_connection().await.is_err());
    }
}
