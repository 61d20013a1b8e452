//! Configuration validation engine.
//!
//! Validates TOML, YAML or JSON configuration against the known schema, detects
//! unknown/misspelled fields, and reports routing and security problems
//! before the worker starts accepting deliveries.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use crate::schema::EbWorkerConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "queue-url",
    /// "handler-spec", "worker", "security", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "messages.user.created"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Expected shape of the configuration.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with user-chosen keys (queue names, message names).
    Map,
    /// Scalar or list value; stop recursion.
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    Struct(HashMap::from([
        ("queues", Map),
        ("messages", Map),
        (
            "worker",
            Struct(HashMap::from([
                ("path", Leaf),
                ("user_agent", Leaf),
                ("trusted_networks", Leaf),
            ])),
        ),
        (
            "metrics",
            Struct(HashMap::from([("enabled", Leaf), ("labels", Map)])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, levenshtein(needle, candidate)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(candidate, _)| candidate)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_str(&content, actual_path);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, Path::new("ebworker.toml"))
}

/// Validate config text, picking the format from `path`'s extension the way
/// the loader does. Nothing is read from disk.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value = match parse_value(raw, path) {
        Ok(v) => v,
        Err(message) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message,
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    match crate::loader::parse_config(raw, path) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Untyped view of the config used for the unknown-field walk.
fn parse_value(raw: &str, path: &Path) -> Result<serde_json::Value, String> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => {
            let value: toml::Value =
                toml::from_str(raw).map_err(|e| format!("TOML syntax error: {e}"))?;
            serde_json::to_value(value).map_err(|e| format!("TOML syntax error: {e}"))
        },
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| format!("YAML syntax error: {e}")),
        "json" => serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}")),
        other => Err(format!("unsupported config format: .{other}")),
    }
}

/// Semantic checks on an already parsed config.
#[must_use]
pub fn validate_config(config: &EbWorkerConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_queues(config, &mut diagnostics);
    check_messages(config, &mut diagnostics);
    check_worker(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let message = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
            None => "unknown field".to_string(),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "unknown-field",
            path,
            message,
        });
    }
}

fn check_queues(config: &EbWorkerConfig, diagnostics: &mut Vec<Diagnostic>) {
    for (name, url) in &config.queues {
        let path = format!("queues.{name}");
        if url.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "queue-url",
                path,
                message: "queue URL is empty; flushing this queue will fail".into(),
            });
        } else if url.contains("${") {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "queue-url",
                path,
                message: format!("unresolved environment placeholder in \"{url}\""),
            });
        } else if !url.starts_with("https://") && !url.starts_with("http://") {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "queue-url",
                path,
                message: format!("\"{url}\" does not look like a queue URL"),
            });
        }
    }
}

fn check_messages(config: &EbWorkerConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.messages.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "handler-spec",
            path: "messages".into(),
            message: "no messages are mapped; every delivery will be rejected".into(),
        });
    }

    for (name, spec) in &config.messages {
        let path = format!("messages.{name}");
        let handlers = spec.handlers();
        if handlers.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "handler-spec",
                path: path.clone(),
                message: "handler chain is empty".into(),
            });
        }
        if handlers.iter().any(|h| h.trim().is_empty()) {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "handler-spec",
                path: path.clone(),
                message: "handler name is empty".into(),
            });
        }
        let mut seen = HashSet::new();
        for handler in handlers {
            if !seen.insert(handler.as_str()) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "handler-spec",
                    path: path.clone(),
                    message: format!("handler \"{handler}\" appears more than once in the chain"),
                });
            }
        }
    }
}

fn check_worker(config: &EbWorkerConfig, diagnostics: &mut Vec<Diagnostic>) {
    let worker = &config.worker;

    if !worker.path.starts_with('/') {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "worker",
            path: "worker.path".into(),
            message: format!("route \"{}\" must start with '/'", worker.path),
        });
    }

    if worker.user_agent.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "security",
            path: "worker.user_agent".into(),
            message: "empty user agent matches every client".into(),
        });
    }

    for net in &worker.trusted_networks {
        if net.prefix_len() == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "security",
                path: "worker.trusted_networks".into(),
                message: format!("{net} trusts every address"),
            });
        } else if !is_private(net) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "security",
                path: "worker.trusted_networks".into(),
                message: format!("{net} is not a private network"),
            });
        }
    }
}

fn is_private(net: &ipnet::IpNet) -> bool {
    match net {
        ipnet::IpNet::V4(v4) => {
            let addr = v4.network();
            // 172.0.0.0/8 is the Docker default and wider than RFC 1918.
            addr.is_private() || addr.is_loopback() || addr.octets()[0] == 172
        },
        ipnet::IpNet::V6(v6) => {
            let addr = v6.network();
            addr.is_loopback() || (addr.segments()[0] & 0xfe00) == 0xfc00
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
