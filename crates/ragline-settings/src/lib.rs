//! # ragline-settings
//!
//! Layered configuration for the ragline retrieval pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RaglineSettings::default()`]
//! 2. **User file**: `~/.ragline/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `RAGLINE_*` and `DATABASE_URL` overrides
//!
//! # Usage
//!
//! ```no_run
//! use ragline_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("embedding model: {}", settings.embedding.model);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    load_settings_with, settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<RaglineSettings> = OnceLock::new();

/// Get the process-wide settings instance.
///
/// On first call, loads settings from `~/.ragline/settings.json` with env var
/// overrides. If loading fails, falls back to compiled defaults.
pub fn get_settings() -> &'static RaglineSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RaglineSettings::default()
        })
    })
}

/// Initialize the process-wide settings with a specific value.
///
/// Returns `Err(settings)` if they were already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: RaglineSettings) -> std::result::Result<(), RaglineSettings> {
    SETTINGS.set(settings)
}
