//! Prompt assembly
//!
//! - SYSTEM_PROMPT: fixed instruction sent with every request
//! - build_grading_prompt: per-essay user message
//! - API_TEST_PROMPT: connectivity check used by the settings dialog

/// Fixed system instruction. The `<score>` delimiter is what
/// [`crate::parser::extract_score`] looks for.
pub const SYSTEM_PROMPT: &str = r#"You are a helpful assistant that grades high-school English essays.
1. Answer in Chinese unless the user asks otherwise.
2. Unless the user asks for more, do not analyse or give suggestions; output only the score.
3. If the essay cannot be recognised, give 0 points.
4. Always write the score in this exact format so the calling program can read it: <score>NN分</score>"#;

/// Prompt sent by "Test API".
pub const API_TEST_PROMPT: &str = "This is a test essay. 使用中文回答，回答“测试成功”";

/// Per-essay user message
///
/// # Arguments
/// * `title` - essay title / task statement
/// * `rubric` - grading rubric, may span several lines
/// * `essay_text` - OCR output (or the OCR failure sentinel)
pub fn build_grading_prompt(title: &str, rubric: &str, essay_text: &str) -> String {
    format!(
        "Essay title: {title}\nGrading rubric: {rubric}\nStudent essay: {essay_text}\nPlease grade the essay according to the rubric and give suggestions."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_grading_prompt_contains_all_parts() {
        let prompt = build_grading_prompt("My Hometown", "Content 10\nLanguage 5", "I love my hometown.");
        assert!(prompt.starts_with("Essay title: My Hometown\n"));
        assert!(prompt.contains("Grading rubric: Content 10\nLanguage 5\n"));
        assert!(prompt.contains("Student essay: I love my hometown.\n"));
    }

    #[test]
    fn test_build_grading_prompt_asks_for_suggestions() {
        let prompt = build_grading_prompt("t", "r", "e");
        assert!(prompt.ends_with("Please grade the essay according to the rubric and give suggestions."));
    }

    #[test]
    fn test_system_prompt_names_score_delimiter() {
        assert!(SYSTEM_PROMPT.contains("<score>NN分</score>"));
    }
}
