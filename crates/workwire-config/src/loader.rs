// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./workwire.toml` > `~/.config/workwire/workwire.toml`
//! > `/etc/workwire/workwire.toml` with environment variable overrides via
//! `WORKWIRE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WorkwireConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/workwire/workwire.toml` (system-wide)
/// 3. `~/.config/workwire/workwire.toml` (user XDG config)
/// 4. `./workwire.toml` (local directory)
/// 5. `WORKWIRE_*` environment variables
pub fn load_config() -> Result<WorkwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorkwireConfig::default()))
        .merge(Toml::file("/etc/workwire/workwire.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("workwire/workwire.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("workwire.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WorkwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorkwireConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WorkwireConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WorkwireConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WORKWIRE_AUTH_JWT_SECRET` must map to
/// `auth.jwt_secret`, not `auth.jwt.secret`.
fn env_provider() -> Env {
    Env::prefixed("WORKWIRE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("auth_", "auth.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
