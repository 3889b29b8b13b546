//! Loader for extractor configuration with YAML + environment overlays.
//!
//! Every field has a default, so an empty source set yields a usable
//! [`FineprintConfig`]. Sources are merged in the order they are added;
//! `FINEPRINT__SECTION__KEY` environment variables are applied last and
//! win over files. String values may reference `${VAR}` placeholders which
//! are expanded after merging.
use config::{Config, ConfigError, Environment, File};
use fineprint_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Environment prefix for overrides (`FINEPRINT__FETCH__TIMEOUT_SECS=10`).
pub const ENV_PREFIX: &str = "FINEPRINT";

/// Marker appended when extracted text is clamped.
pub const DEFAULT_TRUNCATION_MARKER: &str = "... (content truncated for analysis)";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FineprintConfig {
    pub fetch: FetchConfig,
    pub limits: LimitsConfig,
    pub extraction: ExtractionConfig,
    pub logging: LoggingConfig,
}

/// Knobs for the HTTP download step.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Retries for 429/5xx and transport errors, on top of the first attempt.
    pub retries: usize,
    pub max_redirects: usize,
    pub user_agent: String,
    /// Bodies shorter than this are treated as "no content".
    pub min_bytes: usize,
    /// Bodies longer than this are treated as "no content".
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 5,
            retries: 1,
            max_redirects: 2,
            user_agent: concat!("fineprint-text-extractor/", env!("CARGO_PKG_VERSION")).into(),
            min_bytes: 10,
            max_bytes: 20_000_000,
        }
    }
}

/// Character thresholds applied to extracted text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub truncation_marker: String,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_chars: 200,
            max_chars: 50_000,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.into(),
        }
    }
}

/// Switches handed to the content extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub include_comments: bool,
    pub include_tables: bool,
    pub include_formatting: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            include_comments: false,
            include_tables: true,
            include_formatting: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
    pub dir: Option<PathBuf>,
    pub emit_stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".into(),
            dir: None,
            emit_stderr: false,
        }
    }
}

impl FineprintConfig {
    /// Reject combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_chars == 0 {
            return Err(ConfigError::Message("limits.max_chars must be > 0".into()));
        }
        if self.limits.min_chars > self.limits.max_chars {
            return Err(ConfigError::Message(format!(
                "limits.min_chars ({}) exceeds limits.max_chars ({})",
                self.limits.min_chars, self.limits.max_chars
            )));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Message("fetch.timeout_secs must be > 0".into()));
        }
        if self.fetch.min_bytes > self.fetch.max_bytes {
            return Err(ConfigError::Message(format!(
                "fetch.min_bytes ({}) exceeds fetch.max_bytes ({})",
                self.fetch.min_bytes, self.fetch.max_bytes
            )));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct FineprintConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for FineprintConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FineprintConfigLoader {
    /// Start with no files; `FINEPRINT__` env overrides are always applied.
    ///
    /// ```
    /// use fineprint_config::FineprintConfigLoader;
    ///
    /// let config = FineprintConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.limits.min_chars, 200);
    /// assert_eq!(config.limits.max_chars, 50_000);
    /// assert!(config.extraction.include_tables);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use fineprint_config::FineprintConfigLoader;
    ///
    /// let cfg = FineprintConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// fetch:
    ///   timeout_secs: 10
    /// limits:
    ///   max_chars: 1000
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.fetch.timeout_secs, 10);
    /// assert_eq!(cfg.fetch.max_redirects, 2);
    /// assert_eq!(cfg.limits.max_chars, 1000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Environment variables are layered on top of every file source, then
    /// `${VAR}` placeholders are expanded and the result is validated.
    ///
    /// ```
    /// use fineprint_config::FineprintConfigLoader;
    ///
    /// unsafe { std::env::set_var("FP_DOC_AGENT", "doc-agent/1.0"); }
    ///
    /// let config = FineprintConfigLoader::new()
    ///     .with_yaml_str("fetch:\n  user_agent: \"${FP_DOC_AGENT}\"\n")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.fetch.user_agent, "doc-agent/1.0");
    ///
    /// unsafe { std::env::remove_var("FP_DOC_AGENT"); }
    /// ```
    pub fn load(self) -> Result<FineprintConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: FineprintConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
