//! Text report formatting
//!
//! Per-essay report layout:
//! ```text
//! [OCR text]
//! ...
//!
//! [AI grading]
//! ...
//!
//! [API usage]
//! Prompt tokens: 812
//! Completion tokens: 35
//! ```

use crate::types::TokenUsage;

pub const SUMMARY_FILE_NAME: &str = "total.txt";

/// Body of `<stem>.txt` for one essay.
pub fn format_essay_report(ocr_text: &str, response: &str, usage: Option<&TokenUsage>) -> String {
    let mut out = String::new();
    out.push_str("[OCR text]\n");
    out.push_str(ocr_text);
    out.push_str("\n\n[AI grading]\n");
    out.push_str(response);
    out.push_str("\n\n");

    if let Some(usage) = usage.filter(|u| !u.is_empty()) {
        out.push_str("[API usage]\n");
        if let Some(n) = usage.prompt_tokens {
            out.push_str(&format!("Prompt tokens: {n}\n"));
        }
        if let Some(n) = usage.completion_tokens {
            out.push_str(&format!("Completion tokens: {n}\n"));
        }
    }
    out
}

/// Sums of all present counts; missing counts contribute nothing.
pub fn total_usage<'a, I>(usages: I) -> (u64, u64)
where
    I: IntoIterator<Item = Option<&'a TokenUsage>>,
{
    usages
        .into_iter()
        .flatten()
        .fold((0, 0), |(p, c), u| {
            (
                p + u.prompt_tokens.unwrap_or(0),
                c + u.completion_tokens.unwrap_or(0),
            )
        })
}

/// Body of the batch summary file.
///
/// `reports` is `(report file name, report body)` in selection order.
pub fn format_summary(
    timestamp: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
    reports: &[(String, String)],
) -> String {
    let mut out = format!(
        "[Generated] {timestamp}\n[Total prompt tokens]: {prompt_tokens}\n[Total completion tokens]: {completion_tokens}\n\n"
    );
    for (name, body) in reports {
        out.push_str(&format!("===== {name} =====\n"));
        out.push_str(body);
        out.push_str("\n\n");
    }
    out
}
