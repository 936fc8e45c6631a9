use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "essay-grader")]
#[command(about = "OCR photographed English essays and grade them with an LLM", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: <config dir>/essay-grader/settings.toml)
    #[arg(long, global = true, env = "ESSAY_GRADER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug-level console output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Grade essay images and write results next to the first image
    Grade {
        /// Essay images, processed in the given order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Essay title (default: the saved title)
        #[arg(short, long)]
        title: Option<String>,

        /// Grading rubric (default: the saved rubric)
        #[arg(short, long, conflicts_with = "rubric_file")]
        rubric: Option<String>,

        /// Read the rubric from a file
        #[arg(long)]
        rubric_file: Option<PathBuf>,

        /// Ignore cost-saving mode and start immediately
        #[arg(long)]
        now: bool,
    },

    /// Show or change settings
    Config {
        /// Print current settings
        #[arg(long)]
        show: bool,

        /// Store the API key
        #[arg(long)]
        set_api_key: Option<String>,

        /// Provider (deepseek/chatgpt)
        #[arg(long)]
        provider: Option<AiProvider>,

        /// DeepSeek deep-think (reasoner model)
        #[arg(long)]
        deep_think: Option<bool>,

        /// Defer batches to the 00:30-08:30 off-peak window
        #[arg(long)]
        cost_saving: Option<bool>,

        /// Edit settings with prompts
        #[arg(short, long)]
        interactive: bool,
    },

    /// Send a short test prompt to the configured provider
    TestApi,

    /// Find the Tesseract binary and save its path
    LocateOcr,
}
