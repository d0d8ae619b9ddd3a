//! Shared constants for end-to-end tests
#![allow(dead_code)] // Not every test binary uses every constant

/// Primary test user.
pub const TEST_USER: &str = "u1";
/// Auth token mapped to the primary test user.
pub const TEST_TOKEN: &str = "token-u1";

/// Secondary user, for ownership and scoping tests.
pub const OTHER_USER: &str = "u2";
/// Auth token mapped to the secondary user.
pub const OTHER_TOKEN: &str = "token-u2";

pub const REQUEST_TIMEOUT_SECS: u64 = 5;
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
