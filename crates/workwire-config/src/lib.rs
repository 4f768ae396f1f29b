// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Workwire realtime core.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use workwire_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WorkwireConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// The high-level entry point: loads config from TOML files + env vars via
/// Figment, then runs post-deserialization validation. Figment errors are
/// converted to diagnostics with typo suggestions.
pub fn load_and_validate() -> Result<WorkwireConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<WorkwireConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_and_validate_str_accepts_complete_config() {
        let config = load_and_validate_str(
            "[auth]\njwt_secret = \"s3cret\"\n\n[storage]\ndatabase_path = \"/tmp/w.db\"\n",
        )
        .unwrap();
        assert_eq!(config.storage.database_path, "/tmp/w.db");
    }

    #[test]
    fn load_and_validate_str_rejects_missing_secret() {
        let errors = load_and_validate_str("").unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("jwt_secret")));
    }

    #[test]
    fn load_and_validate_str_rejects_unknown_key() {
        let errors = load_and_validate_str("[server]\nhots = \"x\"\n").unwrap_err();
        assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
    }
}
