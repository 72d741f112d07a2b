//! Usage: Map identity REST API failures (error bodies, transport errors) to `auth/*` codes.

use crate::shared::error::AuthError;
use serde_json::Value;

/// REST error message -> client error code, where the names differ.
const RENAMED_CODES: &[(&str, &str)] = &[
    ("EMAIL_EXISTS", "auth/email-already-in-use"),
    ("EMAIL_NOT_FOUND", "auth/user-not-found"),
    ("INVALID_PASSWORD", "auth/wrong-password"),
    ("INVALID_LOGIN_CREDENTIALS", "auth/invalid-credential"),
    ("TOO_MANY_ATTEMPTS_TRY_LATER", "auth/too-many-requests"),
    ("PASSWORD_LOGIN_DISABLED", "auth/operation-not-allowed"),
    ("ADMIN_ONLY_OPERATION", "auth/admin-restricted-operation"),
    ("MISSING_EMAIL", "auth/invalid-email"),
    ("INVALID_ID_TOKEN", "auth/invalid-user-token"),
    ("TOKEN_EXPIRED", "auth/user-token-expired"),
    ("CREDENTIAL_TOO_OLD_LOGIN_AGAIN", "auth/requires-recent-login"),
    ("API_KEY_INVALID", "auth/invalid-api-key"),
];

const INVALID_API_KEY_REASON: &str = "API_KEY_INVALID";
const INVALID_API_KEY_MESSAGE: &str = "API key not valid";

/// Pull the `error.message` field out of a REST error body.
pub(super) fn parse_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    if let Some(message) = error.as_str() {
        return Some(message.trim().to_string()).filter(|v| !v.is_empty());
    }
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A rejected API key comes back as a prose message; the machine-readable
/// marker sits in `error.details[].reason` or `error.errors[].reason`.
fn is_invalid_api_key(body: &str, message: Option<&str>) -> bool {
    if message.is_some_and(|m| m.starts_with(INVALID_API_KEY_MESSAGE)) {
        return true;
    }
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    ["details", "errors"].iter().any(|list| {
        value
            .pointer(&format!("/error/{list}"))
            .and_then(Value::as_array)
            .is_some_and(|entries| {
                entries.iter().any(|entry| {
                    entry.get("reason").and_then(Value::as_str) == Some(INVALID_API_KEY_REASON)
                })
            })
    })
}

/// `WEAK_PASSWORD : Password should be at least 6 characters` -> `WEAK_PASSWORD`.
fn server_code(message: &str) -> &str {
    message.split(" : ").next().unwrap_or(message).trim()
}

fn is_server_code_shape(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
}

pub(super) fn client_code_for(message: &str) -> Option<String> {
    let code = server_code(message);
    if !is_server_code_shape(code) {
        return None;
    }
    if let Some((_, mapped)) = RENAMED_CODES.iter().find(|(raw, _)| *raw == code) {
        return Some((*mapped).to_string());
    }
    Some(format!("auth/{}", code.to_ascii_lowercase().replace('_', "-")))
}

/// Error for a non-success HTTP response.
pub(super) fn from_response(status: reqwest::StatusCode, body: &str) -> AuthError {
    let message = parse_error_message(body);
    if is_invalid_api_key(body, message.as_deref()) {
        let detail = message.unwrap_or_else(|| INVALID_API_KEY_REASON.to_string());
        return AuthError::new("auth/invalid-api-key", detail);
    }
    if let Some(code) = message.as_deref().and_then(client_code_for) {
        return AuthError::new(code, message.unwrap_or_default());
    }
    if status.is_server_error() {
        return AuthError::new(
            "auth/internal-error",
            format!("identity service returned status={}", status.as_u16()),
        );
    }
    let detail = message.unwrap_or_else(|| format!("status={}", status.as_u16()));
    AuthError::new("auth/internal-error", detail)
}

pub(super) fn from_transport(operation: &str, err: reqwest::Error) -> AuthError {
    let code = if err.is_timeout() {
        "auth/timeout"
    } else {
        "auth/network-request-failed"
    };
    AuthError::new(code, format!("{operation} request failed: {err}")).with_source(err)
}
