use clap::Parser;
use dialoguer::{Confirm, Input, Password, Select};
use essay_grader::{ai_provider, batch, cli, config, error, grader, logging, ocr, schedule};
use ai_provider::AiProvider;
use batch::{BatchEvent, BatchOutcome, BatchRequest, StartPolicy};
use cli::{Cli, Commands};
use config::Settings;
use error::{GraderError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings_path = match cli.config {
        Some(path) => path,
        None => config::default_settings_path()?,
    };
    let _guard = logging::init(&config::debug_log_path(&settings_path), cli.verbose);
    let mut settings = Settings::load_or_default(&settings_path);

    match cli.command {
        Commands::Grade { images, title, rubric, rubric_file, now } => {
            println!("📝 essay-grader - grading\n");

            let rubric = match (rubric, rubric_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => settings.prompt.rubric.clone(),
            };
            let request = BatchRequest {
                images,
                title: title.unwrap_or_else(|| settings.prompt.title.clone()),
                rubric,
            };
            batch::validate(&request, &settings)?;

            println!("[1/3] Locating Tesseract...");
            let tesseract = ocr::locate_tesseract(&mut settings, &settings_path)?;
            println!("✔ {}\n", tesseract.display());

            let policy = if now { StartPolicy::Immediately } else { StartPolicy::from_settings(&settings) };
            run_grade(request, &settings, tesseract, policy).await?;
        }

        Commands::Config { show, set_api_key, provider, deep_think, cost_saving, interactive } => {
            let mut changed = false;
            if let Some(key) = set_api_key {
                settings.api.key = key;
                changed = true;
            }
            if let Some(provider) = provider {
                settings.api.provider = provider;
                changed = true;
            }
            if let Some(value) = deep_think {
                settings.api.deep_think = value;
                changed = true;
            }
            if let Some(value) = cost_saving {
                settings.api.cost_saving = value;
                changed = true;
            }
            if interactive {
                edit_interactively(&mut settings)?;
                changed = true;
            }
            if changed {
                settings.save(&settings_path)?;
                println!("✔ Settings saved: {}", settings_path.display());
            }

            if show || !changed {
                print_settings(&settings, &settings_path);
            }
        }

        Commands::TestApi => {
            let client = grader::GradingClient::from_settings(&settings)?;
            println!("Testing {} ({})...", client.provider(), client.model());
            match client.test_connection().await {
                Ok(preview) => println!("✔ API test succeeded: {preview}"),
                Err(message) => return Err(GraderError::Api(message)),
            }
        }

        Commands::LocateOcr => {
            let path = ocr::locate_tesseract(&mut settings, &settings_path)?;
            println!("✔ Tesseract: {}", path.display());
        }
    }

    Ok(())
}

async fn run_grade(
    request: BatchRequest,
    settings: &Settings,
    tesseract: std::path::PathBuf,
    policy: StartPolicy,
) -> Result<()> {
    let client = grader::GradingClient::from_settings(settings)?;
    let annotator = essay_grader::annotate::Annotator::from_settings(&settings.annotate)?;
    let recognizer = ocr::TesseractOcr::new(tesseract);
    let (canceller, token) = schedule::cancel_pair();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            canceller.cancel();
        }
    });

    let total = request.images.len() as u64;
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let (tx, rx) = std::sync::mpsc::channel();
    let progress = bar.clone();
    let reporter = std::thread::spawn(move || {
        for event in rx {
            match event {
                BatchEvent::Waiting { until } => {
                    progress.println(format!("⏳ Cost-saving mode: grading starts at {}", until.format("%Y-%m-%d %H:%M")));
                }
                BatchEvent::Started { output_dir, .. } => {
                    progress.println(format!("[2/3] Grading into {}", output_dir.display()));
                }
                BatchEvent::Progress { index, preview, .. } => {
                    progress.set_position(index as u64 + 1);
                    progress.set_message(preview);
                }
                _ => {}
            }
        }
    });

    let outcome = batch::run_batch(&request, &recognizer, &client, &annotator, policy, &token, &tx).await;
    drop(tx);
    let _ = reporter.join();
    bar.finish_and_clear();

    match outcome? {
        BatchOutcome::Finished(summary) => {
            println!("[3/3] Results");
            for outcome in &summary.outcomes {
                let name = outcome.image.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                println!("  {name}: {}", outcome.score_label);
            }
            println!(
                "\nTokens: {} prompt / {} completion",
                summary.total_prompt_tokens, summary.total_completion_tokens
            );
            println!("✅ Done: {}", summary.output_dir.display());
        }
        BatchOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}

fn edit_interactively(settings: &mut Settings) -> Result<()> {
    let to_cli = |e: dialoguer::Error| GraderError::Cli(e.to_string());

    let labels: Vec<String> = AiProvider::ALL.iter().map(|p| p.to_string()).collect();
    let current = AiProvider::ALL
        .iter()
        .position(|p| *p == settings.api.provider)
        .unwrap_or(0);
    let picked = Select::new()
        .with_prompt("API provider")
        .items(&labels)
        .default(current)
        .interact()
        .map_err(to_cli)?;
    settings.api.provider = AiProvider::ALL[picked];

    let key = Password::new()
        .with_prompt("API key (empty keeps the current one)")
        .allow_empty_password(true)
        .interact()
        .map_err(to_cli)?;
    if !key.trim().is_empty() {
        settings.api.key = key.trim().to_string();
    }

    if settings.api.provider.supports_deep_think() {
        settings.api.deep_think = Confirm::new()
            .with_prompt("DeepSeek deep think")
            .default(settings.api.deep_think)
            .interact()
            .map_err(to_cli)?;
    }

    settings.api.cost_saving = Confirm::new()
        .with_prompt("Cost-saving mode (start batches between 00:30 and 08:30)")
        .default(settings.api.cost_saving)
        .interact()
        .map_err(to_cli)?;

    settings.prompt.title = Input::new()
        .with_prompt("Essay title")
        .with_initial_text(settings.prompt.title.clone())
        .allow_empty(true)
        .interact_text()
        .map_err(to_cli)?;

    Ok(())
}

fn print_settings(settings: &Settings, path: &Path) {
    println!("Settings ({}):", path.display());
    println!("  Provider: {}", settings.api.provider);
    println!("  API key: {}", if settings.effective_api_key().is_some() { "set" } else { "not set" });
    println!("  Deep think: {}", settings.api.deep_think);
    println!("  Cost-saving: {}", settings.api.cost_saving);
    println!("  Title: {}", settings.prompt.title);
    println!("  Rubric: {} lines", settings.prompt.rubric.lines().count());
    match &settings.ocr.binary_path {
        Some(p) => println!("  Tesseract: {}", p.display()),
        None => println!("  Tesseract: not located"),
    }
}
