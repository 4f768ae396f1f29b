// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection authenticator for the Workwire realtime core.
//!
//! Verifies the bearer token presented at connection time (HS256-signed,
//! expiring) and binds the verified `(user_id, role)` pair to the
//! connection. Both transports use the same verifier: the REST middleware
//! and the WebSocket handshake.
//!
//! Verification is fail-closed. A token whose subject does not match the
//! claimed user id is rejected even if the signature is valid -- a stolen
//! token cannot be replayed under another identity.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use workwire_core::{AdapterType, AuthAdapter, HealthStatus, Identity, PluginAdapter, Role, WireError};

/// Claims carried by a Workwire access token.
///
/// `userType` is optional; absent means worker, matching what the token
/// issuer has always emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userType", default)]
    pub user_type: Option<Role>,
    /// Expiry as a unix timestamp, validated by the decoder.
    pub exp: u64,
}

/// HS256 token verifier implementing [`AuthAdapter`].
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Create a verifier over the shared HMAC secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // The issuer sets no audience.
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry and return the identity the token
    /// itself carries. Used by the request/response path, where no
    /// separate identity is claimed.
    pub fn authenticate_token(&self, token: &str) -> Result<Identity, WireError> {
        if token.is_empty() {
            return Err(WireError::Auth("no token provided".to_string()));
        }
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| WireError::Auth(format!("invalid or expired token: {e}")))?;
        Ok(Identity {
            user_id: data.claims.user_id,
            role: data.claims.user_type.unwrap_or(Role::Worker),
        })
    }

    /// Synchronous verification core, shared by the trait impl and the
    /// gateway handshake.
    pub fn verify_token(&self, token: &str, claimed_user_id: &str) -> Result<Identity, WireError> {
        if claimed_user_id.is_empty() {
            return Err(WireError::Auth("no user id provided".to_string()));
        }
        let identity = self.authenticate_token(token)?;

        if identity.user_id != claimed_user_id {
            tracing::debug!(
                token_user = %identity.user_id,
                claimed_user = %claimed_user_id,
                "token subject mismatch"
            );
            return Err(WireError::Auth(
                "token does not belong to this user".to_string(),
            ));
        }

        Ok(identity)
    }
}

#[async_trait]
impl PluginAdapter for JwtAuthenticator {
    fn name(&self) -> &str {
        "jwt"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Auth
    }

    async fn health_check(&self) -> Result<HealthStatus, WireError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WireError> {
        Ok(())
    }
}

#[async_trait]
impl AuthAdapter for JwtAuthenticator {
    async fn verify(&self, token: &str, claimed_user_id: &str) -> Result<Identity, WireError> {
        self.verify_token(token, claimed_user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "test-secret";

    fn issue(user_id: &str, user_type: Option<Role>, exp_offset_secs: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset_secs) as u64;
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            user_type,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_binds_identity() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u1", Some(Role::Client), 3600);
        let identity = auth.verify(&token, "u1").await.unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.role, Role::Client);
    }

    #[tokio::test]
    async fn missing_user_type_defaults_to_worker() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u1", None, 3600);
        let identity = auth.verify(&token, "u1").await.unwrap();
        assert_eq!(identity.role, Role::Worker);
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let err = auth.verify("", "u1").await.unwrap_err();
        assert!(matches!(err, WireError::Auth(_)));
        assert!(err.to_string().contains("no token"));
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u1", None, 3600);
        let err = auth.verify(&token, "").await.unwrap_err();
        assert!(err.to_string().contains("no user id"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u1", None, -3600);
        let err = auth.verify(&token, "u1").await.unwrap_err();
        assert!(matches!(err, WireError::Auth(_)));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let auth = JwtAuthenticator::new("other-secret");
        let token = issue("u1", None, 3600);
        assert!(auth.verify(&token, "u1").await.is_err());
    }

    #[tokio::test]
    async fn subject_mismatch_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u1", Some(Role::Client), 3600);
        let err = auth.verify(&token, "u2").await.unwrap_err();
        assert!(err.to_string().contains("does not belong"));
    }

    #[test]
    fn authenticate_token_takes_identity_from_claims() {
        let auth = JwtAuthenticator::new(SECRET);
        let token = issue("u9", Some(Role::Client), 3600);
        let identity = auth.authenticate_token(&token).unwrap();
        assert_eq!(identity.user_id, "u9");
        assert_eq!(identity.role, Role::Client);
    }

    #[test]
    fn adapter_metadata() {
        let auth = JwtAuthenticator::new(SECRET);
        assert_eq!(auth.name(), "jwt");
        assert_eq!(auth.adapter_type(), AdapterType::Auth);
    }
}
