//! Shared building blocks for the Fineprint crates.
//!
//! Today this is only the observability layer: every binary and test
//! harness installs its `tracing` subscriber through
//! [`observability::init_logging`] so that logs land in one rolling file
//! sink and never on standard output, which is reserved for the JSON
//! result document.
//!
//! ```rust
//! use fineprint_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "fineprint");
//! assert!(!cfg.emit_stderr);
//! ```

pub mod observability;
