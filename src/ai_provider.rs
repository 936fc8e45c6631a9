use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hosted chat-completion provider
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum AiProvider {
    #[default]
    Deepseek,
    #[serde(alias = "ChatGPT")]
    #[value(name = "chatgpt")]
    ChatGpt,
}

impl AiProvider {
    pub const ALL: [AiProvider; 2] = [AiProvider::Deepseek, AiProvider::ChatGpt];

    pub fn base_url(&self) -> &'static str {
        match self {
            AiProvider::Deepseek => "https://api.deepseek.com",
            AiProvider::ChatGpt => "https://api.openai.com/v1",
        }
    }

    pub fn model(&self, deep_think: bool) -> &'static str {
        match self {
            AiProvider::Deepseek if deep_think => "deepseek-reasoner",
            AiProvider::Deepseek => "deepseek-chat",
            AiProvider::ChatGpt => "gpt-3.5-turbo",
        }
    }

    pub fn usage_dashboard_url(&self) -> &'static str {
        match self {
            AiProvider::Deepseek => "https://platform.deepseek.com/usage",
            AiProvider::ChatGpt => "https://platform.openai.com/usage",
        }
    }

    /// Environment variable that overrides the stored key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            AiProvider::Deepseek => "DEEPSEEK_API_KEY",
            AiProvider::ChatGpt => "OPENAI_API_KEY",
        }
    }

    pub fn supports_deep_think(&self) -> bool {
        matches!(self, AiProvider::Deepseek)
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProvider::Deepseek => write!(f, "Deepseek"),
            AiProvider::ChatGpt => write!(f, "ChatGPT-3.5 (not recommended)"),
        }
    }
}
