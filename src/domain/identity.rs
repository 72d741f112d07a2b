//! Usage: Session data model (signed-in identity, session state, per-failure error record).

use crate::shared::error::AuthError;
use serde::{Deserialize, Serialize};

/// Snapshot of the signed-in account as reported by the identity backend.
///
/// The controller never edits a snapshot; each session notification replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    /// Sign-in provider that produced the session (`password`, `google.com`, `github.com`).
    pub provider_id: String,
}

/// The single record describing who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<UserIdentity>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequirement {
    /// Page is only for signed-in users (dashboard).
    SignedIn,
    /// Page is only for signed-out users (login, sign-up).
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Session not resolved yet; show a loading screen.
    Pending,
    Allow,
    Redirect,
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn access(&self, requirement: AccessRequirement) -> RouteAccess {
        if self.is_loading {
            return RouteAccess::Pending;
        }
        match (requirement, self.is_signed_in()) {
            (AccessRequirement::SignedIn, false) | (AccessRequirement::SignedOut, true) => {
                RouteAccess::Redirect
            }
            _ => RouteAccess::Allow,
        }
    }
}

/// Raw failure details kept for telemetry; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub code: String,
    pub raw_message: String,
    pub context: String,
}

impl ErrorRecord {
    pub fn from_error(err: &AuthError, context: &str) -> Self {
        Self {
            code: err.code().to_string(),
            raw_message: err.message().to_string(),
            context: context.to_string(),
        }
    }
}
