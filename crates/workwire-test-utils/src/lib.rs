// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Workwire integration tests.

pub mod harness;

pub use harness::{TEST_SECRET, TestConnection, TestHarness, issue_token};
