//! Score extraction
//!
//! The model is only instructed to wrap the score in `<score>...</score>`;
//! nothing validates it, so extraction is best effort. Older prompts used
//! `</>` as the closing tag and both are accepted.

use crate::error::{Error, Result};
use crate::types::NO_SCORE;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SCORE_RE: Regex = Regex::new(r"(?s)<score>(.*?)</(?:score)?>").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\d+(?:\.\d+)?").unwrap();
}

/// First `<score>` token in a response, trimmed.
///
/// ```
/// use essay_grader_common::extract_score;
///
/// assert_eq!(extract_score("总评 <score>18分</score>").as_deref(), Some("18分"));
/// assert_eq!(extract_score("no score here"), None);
/// ```
pub fn extract_score(response: &str) -> Option<String> {
    SCORE_RE
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// The text stamped on the image: the score token or [`NO_SCORE`].
pub fn score_label(response: &str) -> String {
    extract_score(response).unwrap_or_else(|| NO_SCORE.to_string())
}

/// Numeric value of a score label such as `"18分"` or `"12.5 / 15"`.
pub fn parse_score_value(label: &str) -> Result<f32> {
    let m = NUMBER_RE
        .find(label)
        .ok_or_else(|| Error::Parse(format!("no numeric score in {label:?}")))?;
    m.as_str()
        .parse::<f32>()
        .map_err(|e| Error::Parse(format!("{label:?}: {e}")))
}
