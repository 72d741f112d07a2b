//! Usage: Diagnostic command handlers driven by the `workhub-auth` binary.

pub mod auth;
