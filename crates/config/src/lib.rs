//! Configuration loading, env substitution, and validation.
//!
//! Config files: `ebworker.toml`, `ebworker.yaml`, `ebworker.yml`, or
//! `ebworker.json`, searched in `./` then `~/.config/ebworker/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config, parse_config},
    schema::{EbWorkerConfig, HandlerSpec, MetricsConfig, WorkerConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
