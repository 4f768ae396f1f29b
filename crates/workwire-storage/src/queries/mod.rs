// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs through the
//! single writer via `conn.call()`.

pub mod conversations;
pub mod messages;

use std::str::FromStr;

use workwire_core::types::{MessageKind, Role};

/// Parse a stored role column, mapping bad data to a rusqlite conversion error.
pub(crate) fn parse_role(idx: usize, value: String) -> rusqlite::Result<Role> {
    Role::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a stored message-kind column.
pub(crate) fn parse_kind(idx: usize, value: String) -> rusqlite::Result<MessageKind> {
    MessageKind::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
