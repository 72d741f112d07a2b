//! Usage: Identity backend error codes -> user-facing messages, plus failure telemetry.

use crate::domain::analytics::Telemetry;
use crate::domain::identity::ErrorRecord;
use crate::shared::error::AuthError;
use serde::Serialize;

pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    UserDisabled,
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    TooManyRequests,
    WeakPassword,
    AccountExistsWithDifferentCredential,
    PopupBlocked,
    PopupClosedByUser,
    CancelledPopupRequest,
    OperationNotAllowed,
    OperationNotSupportedInThisEnvironment,
    AdminRestrictedOperation,
    InvalidApiKey,
    NetworkRequestFailed,
    Timeout,
    InternalError,
}

/// Failure taxonomy used to decide whether a retry affordance makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input or credentials.
    Credential,
    /// OAuth popup blocked or dismissed.
    Interaction,
    /// Network, backend or rate-limit failures.
    Infrastructure,
    /// Sign-in method disabled, admin-only or misconfigured; the end user cannot fix it.
    Configuration,
}

impl ErrorKind {
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Configuration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HelpTopic {
    pub path: &'static str,
    pub title: &'static str,
}

const AUTH_METHOD_TEST: HelpTopic = HelpTopic {
    path: "/auth-method-test",
    title: "Authentication Method Test",
};
const ADMIN_RESTRICTED_FIX: HelpTopic = HelpTopic {
    path: "/admin-restricted-fix",
    title: "Fix Admin Restricted Operation Error",
};
const BACKEND_DEBUG: HelpTopic = HelpTopic {
    path: "/firebase-debug",
    title: "Firebase Debug Tool",
};
const SETUP_GUIDE: HelpTopic = HelpTopic {
    path: "/firebase-setup",
    title: "Firebase Setup Guide",
};

impl AuthErrorCode {
    pub const ALL: [AuthErrorCode; 19] = [
        Self::EmailAlreadyInUse,
        Self::InvalidEmail,
        Self::UserDisabled,
        Self::UserNotFound,
        Self::WrongPassword,
        Self::InvalidCredential,
        Self::TooManyRequests,
        Self::WeakPassword,
        Self::AccountExistsWithDifferentCredential,
        Self::PopupBlocked,
        Self::PopupClosedByUser,
        Self::CancelledPopupRequest,
        Self::OperationNotAllowed,
        Self::OperationNotSupportedInThisEnvironment,
        Self::AdminRestrictedOperation,
        Self::InvalidApiKey,
        Self::NetworkRequestFailed,
        Self::Timeout,
        Self::InternalError,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserDisabled => "auth/user-disabled",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::WeakPassword => "auth/weak-password",
            Self::AccountExistsWithDifferentCredential => {
                "auth/account-exists-with-different-credential"
            }
            Self::PopupBlocked => "auth/popup-blocked",
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::CancelledPopupRequest => "auth/cancelled-popup-request",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::OperationNotSupportedInThisEnvironment => {
                "auth/operation-not-supported-in-this-environment"
            }
            Self::AdminRestrictedOperation => "auth/admin-restricted-operation",
            Self::InvalidApiKey => "auth/invalid-api-key",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::Timeout => "auth/timeout",
            Self::InternalError => "auth/internal-error",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|code| code.as_str() == value)
    }

    pub const fn display_message(self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => {
                "This email is already in use. Please try signing in instead."
            }
            Self::InvalidEmail => "Invalid email address format.",
            Self::UserDisabled => "This account has been disabled. Please contact support.",
            Self::UserNotFound => "No account found with this email address.",
            Self::WrongPassword | Self::InvalidCredential => {
                "Invalid email or password. Please try again."
            }
            Self::TooManyRequests => {
                "Too many failed attempts. Please try again later or reset your password."
            }
            Self::WeakPassword => "Password is too weak. Please use at least 6 characters.",
            Self::AccountExistsWithDifferentCredential => {
                "An account already exists with the same email address but different sign-in credentials."
            }
            Self::PopupBlocked => {
                "Sign-in popup was blocked by your browser. Please allow popups for this site."
            }
            Self::PopupClosedByUser => "Sign-in popup was closed before completing the sign-in.",
            Self::CancelledPopupRequest => "The sign-in process was cancelled.",
            Self::OperationNotAllowed => {
                "This sign-in method is not enabled. Please contact support."
            }
            Self::OperationNotSupportedInThisEnvironment => {
                "This sign-in method is not available in this environment."
            }
            Self::AdminRestrictedOperation => {
                "This operation is restricted to administrators. Please contact support."
            }
            Self::InvalidApiKey => {
                "The app is misconfigured (invalid API key). Please contact support."
            }
            Self::NetworkRequestFailed => {
                "Network error. Please check your internet connection and try again."
            }
            Self::Timeout => "The operation has timed out. Please try again.",
            Self::InternalError => "An internal error has occurred. Please try again later.",
        }
    }

    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::EmailAlreadyInUse
            | Self::InvalidEmail
            | Self::UserDisabled
            | Self::UserNotFound
            | Self::WrongPassword
            | Self::InvalidCredential
            | Self::WeakPassword
            | Self::AccountExistsWithDifferentCredential => ErrorKind::Credential,
            Self::PopupBlocked | Self::PopupClosedByUser | Self::CancelledPopupRequest => {
                ErrorKind::Interaction
            }
            Self::TooManyRequests
            | Self::NetworkRequestFailed
            | Self::Timeout
            | Self::InternalError => ErrorKind::Infrastructure,
            Self::OperationNotAllowed
            | Self::OperationNotSupportedInThisEnvironment
            | Self::AdminRestrictedOperation
            | Self::InvalidApiKey => ErrorKind::Configuration,
        }
    }

    /// Troubleshooting page for codes that usually mean a setup problem.
    pub const fn help_topic(self) -> Option<HelpTopic> {
        match self {
            Self::OperationNotAllowed | Self::AdminRestrictedOperation => {
                Some(ADMIN_RESTRICTED_FIX)
            }
            Self::InvalidApiKey => Some(SETUP_GUIDE),
            Self::NetworkRequestFailed => Some(BACKEND_DEBUG),
            Self::UserNotFound
            | Self::WrongPassword
            | Self::InvalidCredential
            | Self::EmailAlreadyInUse
            | Self::PopupClosedByUser => Some(AUTH_METHOD_TEST),
            _ => None,
        }
    }
}

/// Pure mapping from an error to the sentence shown to the user.
pub fn display_message_for(err: &AuthError) -> String {
    if let Some(code) = AuthErrorCode::from_str(err.code()) {
        return code.display_message().to_string();
    }
    if err.is_backend_code() {
        return format!("Authentication error: {}", err.message());
    }
    UNEXPECTED_ERROR_MESSAGE.to_string()
}

/// Kind of a failure; codes outside the known set count as infrastructure failures.
pub fn kind_of(err: &AuthError) -> ErrorKind {
    AuthErrorCode::from_str(err.code())
        .map(AuthErrorCode::kind)
        .unwrap_or(ErrorKind::Infrastructure)
}

/// Normalize a failed operation's error and report the raw failure to analytics.
pub fn normalize(err: &AuthError, context: &str, telemetry: &Telemetry) -> String {
    let record = ErrorRecord::from_error(err, context);
    tracing::warn!(
        code = %record.code,
        context = %record.context,
        "auth operation failed"
    );
    telemetry.track_auth_failure(&record);
    display_message_for(err)
}
