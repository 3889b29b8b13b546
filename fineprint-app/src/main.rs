use clap::Parser;
use fineprint_web::{ExtractionError, ExtractionResult};
use std::path::PathBuf;
use std::process::ExitCode;

mod app;

const PROGRAM: &str = "text_extractor";

/// Fetch a web page and print its readable text as JSON.
///
/// Standard output only ever carries one JSON document, so there are no
/// `--help`/`--version` flags: `--help` is just another (invalid) URL.
#[derive(Debug, Parser)]
#[command(name = PROGRAM, disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Page to extract.
    #[arg(allow_hyphen_values = true)]
    url: String,

    /// Configuration file (YAML, TOML or JSON).
    #[arg(long, env = "FINEPRINT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(_) => {
            let usage = ExtractionResult::Failure(ExtractionError::Usage(PROGRAM.into()));
            println!(
                "{}",
                serde_json::to_string(&usage).unwrap_or_else(|_| fallback_json(&usage_message()))
            );
            return ExitCode::from(1);
        }
    };

    let result = extract(&cli);
    match result.to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => println!(
            "{}",
            fallback_json(&ExtractionError::unexpected(err).to_string())
        ),
    }
    ExitCode::SUCCESS
}

/// Everything after argument parsing ends up as an [`ExtractionResult`].
fn extract(cli: &Cli) -> ExtractionResult {
    let cfg = match app::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return ExtractionResult::Failure(ExtractionError::unexpected(format!("{err:#}"))),
    };

    if let Some(path) = app::init_observability(&cfg) {
        tracing::debug!(log_file = %path.display(), "logging.ready");
    }

    let outcome = app::build_from_config(&cfg).and_then(|app| app.run(&cli.url));
    match outcome {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "extract.setup_failed");
            ExtractionResult::Failure(ExtractionError::unexpected(format!("{err:#}")))
        }
    }
}

fn usage_message() -> String {
    ExtractionError::Usage(PROGRAM.into()).to_string()
}

fn fallback_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
