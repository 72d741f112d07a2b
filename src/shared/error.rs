//! Usage: Unified auth error model (`code: message`, with backend codes under `auth/`).

use std::sync::Arc;

pub type AuthResult<T> = Result<T, AuthError>;

const BACKEND_CODE_NAMESPACE: &str = "auth/";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AuthError {
    code: String,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for codes reported by the identity backend (`auth/...`).
    pub fn is_backend_code(&self) -> bool {
        is_backend_code(&self.code)
    }
}

fn is_backend_code(code: &str) -> bool {
    let Some(name) = code.strip_prefix(BACKEND_CODE_NAMESPACE) else {
        return false;
    };
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

fn is_local_code(code: &str) -> bool {
    let mut chars = code.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_uppercase()
        && chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(": ").or_else(|| msg.split_once(':'))?;
    let code = maybe_code.trim();
    if !is_backend_code(code) && !is_local_code(code) {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AuthError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AuthError::new(code.to_string(), message.to_string());
        }
        AuthError::new("INTERNAL_ERROR", value)
    }
}

impl From<&'static str> for AuthError {
    fn from(value: &'static str) -> Self {
        AuthError::from(value.to_string())
    }
}

impl From<AuthError> for String {
    fn from(value: AuthError) -> Self {
        value.to_string()
    }
}
