//! Usage: OAuth popup providers and their lookup registry.

pub(crate) mod providers;
pub(crate) mod registry;
