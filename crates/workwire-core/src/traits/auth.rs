// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication adapter trait for identity verification.

use async_trait::async_trait;

use crate::error::WireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Identity;

/// Adapter for verifying a presented credential against a claimed identity.
///
/// Implementations validate the credential's signature and expiry and check
/// that the claimed user id matches the credential's subject. A connection
/// that fails verification must not be allowed any further operation.
#[async_trait]
pub trait AuthAdapter: PluginAdapter {
    /// Verifies `token` and binds it to `claimed_user_id`.
    ///
    /// Returns the verified identity on success. Fails with
    /// [`WireError::Auth`] on a missing/invalid/expired token or an
    /// identity mismatch.
    async fn verify(
        &self,
        token: &str,
        claimed_user_id: &str,
    ) -> Result<Identity, WireError>;
}
