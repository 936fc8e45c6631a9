//! Essay Grader Common Library
//!
//! Types and pure helpers shared by the CLI and the desktop shell

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod report;

pub use types::{Grading, TokenUsage, AI_FAILED, NO_SCORE, OCR_FAILED};
pub use error::{Error, Result};
pub use prompts::{build_grading_prompt, API_TEST_PROMPT, SYSTEM_PROMPT};
pub use parser::{extract_score, parse_score_value, score_label};
pub use report::{format_essay_report, format_summary, total_usage, SUMMARY_FILE_NAME};
