//! Usage: Application layer (composition root, session controller, logging setup).

pub(crate) mod app_state;
pub mod logging;
pub(crate) mod session_controller;
