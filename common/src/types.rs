//! Grading result types
//!
//! Shared by the CLI and the desktop shell:
//! - TokenUsage: prompt/completion counts reported by the provider
//! - Grading: free-text model response plus optional usage

use serde::{Deserialize, Serialize};

/// Sentinel returned in place of a model response when the call fails.
pub const AI_FAILED: &str = "[AI grading failed]";

/// Sentinel returned in place of essay text when OCR yields nothing usable.
pub const OCR_FAILED: &str = "[OCR failed]";

/// Label stamped on the image when the response carries no score.
pub const NO_SCORE: &str = "No score";

/// Token counts attached to a chat completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prompt_tokens.is_none() && self.completion_tokens.is_none()
    }
}

/// One model response for one essay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Grading {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Grading {
    pub fn new(text: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }

    /// The response used when the provider call failed for any reason.
    pub fn failed() -> Self {
        Self {
            text: AI_FAILED.to_string(),
            usage: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.text == AI_FAILED
    }

    /// First `max_chars` characters with newlines flattened, for status lines.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.text.replace('\n', " ");
        if flat.chars().count() > max_chars {
            flat.chars().take(max_chars).collect::<String>() + "..."
        } else {
            flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_grading_has_no_usage() {
        let grading = Grading::failed();
        assert!(grading.is_failed());
        assert!(grading.usage.is_none());
    }

    #[test]
    fn test_preview_flattens_and_truncates() {
        let grading = Grading::new("line one\nline two", None);
        assert_eq!(grading.preview(100), "line one line two");
        assert_eq!(grading.preview(4), "line...");
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let grading = Grading::new("<score>12分</score>很好", None);
        assert_eq!(grading.preview(13), "<score>12分</s...");
    }

    #[test]
    fn test_usage_serde_camel_case() {
        let grading = Grading::new("ok", Some(TokenUsage::new(10, 2)));
        let json = serde_json::to_string(&grading).unwrap();
        assert!(json.contains("\"usage\""));
        assert!(json.contains("\"prompt_tokens\":10"));
        let back: Grading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grading);
    }

    #[test]
    fn test_usage_is_empty() {
        assert!(TokenUsage::default().is_empty());
        assert!(!TokenUsage::new(1, 0).is_empty());
    }
}
