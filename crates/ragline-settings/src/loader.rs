//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RaglineSettings::default()`]
//! 2. If `~/.ragline/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{RaglineSettings, StoreBackend};

/// Resolve the path to the settings file (`~/.ragline/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ragline").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RaglineSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// [`RaglineSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RaglineSettings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `lookup`.
pub fn load_settings_with<F>(path: &Path, lookup: F) -> Result<RaglineSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(RaglineSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RaglineSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut RaglineSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides resolved through `lookup` (an env-like key/value source).
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_overrides<F>(settings: &mut RaglineSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Embedding ───────────────────────────────────────────────────
    if let Some(v) = read("RAGLINE_EMBEDDING_MODEL") {
        settings.embedding.model = v;
    }
    if let Some(v) = read("RAGLINE_EMBEDDING_BASE_URL") {
        settings.embedding.base_url = v;
    }
    if let Some(v) = read("RAGLINE_EMBEDDING_DIMENSIONS") {
        match parse_usize_range(&v, 1, 65_536) {
            Some(n) => settings.embedding.dimensions = Some(n),
            None => warn_invalid("RAGLINE_EMBEDDING_DIMENSIONS", &v),
        }
    }
    if let Some(v) = read("RAGLINE_EMBEDDING_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(n) => settings.embedding.timeout_ms = n,
            None => warn_invalid("RAGLINE_EMBEDDING_TIMEOUT_MS", &v),
        }
    }

    // ── Chunking / retrieval ────────────────────────────────────────
    if let Some(v) = read("RAGLINE_CHUNK_SIZE") {
        match parse_usize_range(&v, 1, 1_000_000) {
            Some(n) => settings.chunking.chunk_size = n,
            None => warn_invalid("RAGLINE_CHUNK_SIZE", &v),
        }
    }
    if let Some(v) = read("RAGLINE_MIN_SIMILARITY") {
        match parse_f64_range(&v, -1.0, 1.0) {
            Some(n) => settings.retrieval.min_similarity = n,
            None => warn_invalid("RAGLINE_MIN_SIMILARITY", &v),
        }
    }
    if let Some(v) = read("RAGLINE_RESULT_LIMIT") {
        match parse_usize_range(&v, 1, 10_000) {
            Some(n) => settings.retrieval.limit = n,
            None => warn_invalid("RAGLINE_RESULT_LIMIT", &v),
        }
    }

    // ── Store ───────────────────────────────────────────────────────
    if let Some(v) = read("RAGLINE_STORE_BACKEND") {
        match parse_backend(&v) {
            Some(b) => settings.store.backend = b,
            None => warn_invalid("RAGLINE_STORE_BACKEND", &v),
        }
    }
    if let Some(v) = read("RAGLINE_SQLITE_PATH") {
        settings.store.sqlite_path = v;
    }
    if let Some(v) = read("RAGLINE_STORE_TABLE") {
        settings.store.table = v;
    }
    if let Some(v) = read("DATABASE_URL") {
        settings.store.database_url = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("RAGLINE_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env override, ignoring");
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f64` within an inclusive range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

/// Parse a store backend name (case-insensitive).
pub fn parse_backend(val: &str) -> Option<StoreBackend> {
    match val.to_lowercase().as_str() {
        "sqlite" => Some(StoreBackend::Sqlite),
        "postgres" | "postgresql" | "pgvector" => Some(StoreBackend::Postgres),
        _ => None,
    }
}
