//! Usage: Cross-cutting helpers (error model, lock recovery, redaction).

pub(crate) mod error;
pub(crate) mod mutex_ext;
pub(crate) mod security;
