//! Usage: Domain modules (session model, error normalization, analytics).

pub(crate) mod analytics;
pub(crate) mod auth_errors;
pub(crate) mod identity;
