// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and non-empty secrets.

use crate::diagnostic::ConfigError;
use crate::model::WorkwireConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WorkwireConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // The gateway is fail-closed: a missing secret rejects every
    // connection, so catch it at startup instead.
    match &config.auth.jwt_secret {
        None => errors.push(ConfigError::Validation {
            message: "auth.jwt_secret is required (set WORKWIRE_AUTH_JWT_SECRET or [auth] jwt_secret)"
                .to_string(),
        }),
        Some(secret) if secret.trim().is_empty() => errors.push(ConfigError::Validation {
            message: "auth.jwt_secret must not be empty".to_string(),
        }),
        Some(_) => {}
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
