use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::{
    Error, Result,
    error::Context,
    env_subst::substitute_env,
    schema::EbWorkerConfig,
};

/// Standard config file names, checked in order.
pub(crate) const CONFIG_FILENAMES: &[&str] = &[
    "ebworker.toml",
    "ebworker.yaml",
    "ebworker.yml",
    "ebworker.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<EbWorkerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ebworker.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/ebworker/ebworker.{toml,yaml,yml,json}` (user-global)
///
/// Returns `EbWorkerConfig::default()` only when no config file exists. A
/// file that is found but cannot be read or parsed is an error.
pub fn discover_and_load() -> Result<EbWorkerConfig> {
    load_discovered(find_config_file())
}

fn load_discovered(path: Option<PathBuf>) -> Result<EbWorkerConfig> {
    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok(EbWorkerConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).inspect_err(|e| {
        error!(path = %path.display(), error = %e, "failed to load config");
    })
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/ebworker/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ebworker").map(|d| d.config_dir().to_path_buf())
}

/// Parse raw (already substituted) config text, picking the format from the
/// file extension. Unknown extensions are rejected.
pub fn parse_config(raw: &str, path: &Path) -> Result<EbWorkerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::unsupported_format(other)),
    }
}
