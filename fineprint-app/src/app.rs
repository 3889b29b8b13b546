use anyhow::{Context, Result};
use fineprint_common::observability::{LogConfig, init_logging};
use fineprint_config::{FineprintConfig, FineprintConfigLoader};
use fineprint_web::{ExtractionPipeline, ExtractionResult};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no `--config` is given.
const DEFAULT_CONFIG_FILE: &str = "fineprint.yaml";

pub struct App {
    pipeline: ExtractionPipeline,
}

impl App {
    /// Extract `url` on a current-thread runtime; the run is sequential and
    /// blocks until the result is ready.
    pub fn run(&self, url: &str) -> Result<ExtractionResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("fineprint")
            .build()
            .context("failed to start async runtime")?;
        Ok(runtime.block_on(self.pipeline.run(url)))
    }
}

/// Load configuration: an explicit file must exist, the default one may not.
pub fn load_config(explicit: Option<&Path>) -> Result<FineprintConfig> {
    let loader = FineprintConfigLoader::new();
    let loader = match explicit {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("invalid configuration")
}

/// Install logging from the `logging` section. Failure is not fatal: the
/// JSON contract on stdout does not depend on it.
pub fn init_observability(cfg: &FineprintConfig) -> Option<PathBuf> {
    let log_cfg = LogConfig {
        app_name: "fineprint",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    };
    match init_logging(log_cfg) {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    }
}

pub fn build_from_config(cfg: &FineprintConfig) -> Result<App> {
    let pipeline =
        ExtractionPipeline::from_config(cfg).context("failed to build extraction pipeline")?;
    Ok(App { pipeline })
}
