//! Usage: Infrastructure (configuration loading).

pub mod settings;
