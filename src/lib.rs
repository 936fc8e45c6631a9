//! OCR photographed English essays, grade them with an LLM, stamp the score.

pub mod ai_provider;
pub mod annotate;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod grader;
pub mod logging;
pub mod ocr;
pub mod schedule;
