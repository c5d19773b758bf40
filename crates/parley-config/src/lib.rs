// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for Parley.
//!
//! TOML files are layered with `PARLEY_*` environment overrides through
//! figment, then checked by [`validation::validate_config`]. Failures come
//! back as [`ConfigError`] diagnostics that `render_errors` prints with
//! source spans and key suggestions.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::ParleyConfig;

/// Load from `path`, or the standard lookup if `None`, and validate.
pub fn load_and_validate(path: Option<&Path>) -> Result<ParleyConfig, Vec<ConfigError>> {
    match loader::build_figment(path).extract::<ParleyConfig>() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(path),
        )),
    }
}

/// Load from an inline TOML document and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<ParleyConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![(
                diagnostic::INLINE_SOURCE.to_string(),
                toml_content.to_string(),
            )];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Read every config file that could have contributed, keyed the way figment
/// reports file sources.
fn collect_toml_sources(path: Option<&Path>) -> Vec<(String, String)> {
    let candidates = match path {
        Some(path) => vec![path.to_path_buf()],
        None => loader::default_config_paths(),
    };

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let content = std::fs::read_to_string(&candidate).ok()?;
            let absolute = if candidate.is_absolute() {
                candidate
            } else {
                std::env::current_dir().ok()?.join(candidate)
            };
            Some((absolute.display().to_string(), content))
        })
        .collect()
}
