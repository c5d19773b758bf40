// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order: `/etc/parley/parley.toml`, then `~/.config/parley/parley.toml`,
//! then `./parley.toml`, then `PARLEY_*` environment variables. A path passed
//! with `--config` replaces the file lookup entirely.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParleyConfig;

/// Config sections reachable from environment variables.
const ENV_SECTIONS: &[&str] = &[
    "server",
    "storage",
    "kv",
    "queue",
    "worker",
    "cache",
    "rate_limit",
    "gemini",
    "billing",
    "client",
];

/// Candidate config files, lowest precedence first.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/parley/parley.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("parley").join("parley.toml"));
    }
    paths.push(PathBuf::from("parley.toml"));
    paths
}

/// Build the figment for the standard lookup, or for `path` if given.
pub fn build_figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(ParleyConfig::default()));
    match path {
        Some(path) => figment = figment.merge(Toml::file(path)),
        None => {
            for candidate in default_config_paths() {
                figment = figment.merge(Toml::file(candidate));
            }
        }
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard lookup plus env overrides.
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    build_figment(None).extract()
}

/// Load configuration from one file plus env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    build_figment(Some(path)).extract()
}

/// Load configuration from an inline TOML document. Env vars are ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// `PARLEY_<SECTION>_<KEY>` maps to `<section>.<key>`.
///
/// Sections are matched by name rather than splitting on `_`, since both
/// section names (`rate_limit`) and keys (`database_path`) contain underscores.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_").map(|key| {
        let key = key.as_str();
        for section in ENV_SECTIONS {
            if let Some(rest) = key
                .strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key.to_string().into()
    })
}
