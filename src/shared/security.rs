//! Usage: Redaction helpers for tokens and email addresses in logs and error snippets.

use serde_json::Value;

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;
const MAX_SNIPPET_CHARS: usize = 500;

pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let len = trimmed.chars().count();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix: String = trimmed.chars().take(TOKEN_MASK_PREFIX_LEN).collect();
    let suffix: String = trimmed
        .chars()
        .skip(len - TOKEN_MASK_SUFFIX_LEN)
        .collect();
    format!("{prefix}...{suffix}")
}

/// `ann@example.com` -> `a***@example.com`.
pub(crate) fn mask_email(email: &str) -> String {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        _ => "***".to_string(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token")
        || key_lc.contains("password")
        || key_lc.contains("secret")
        || key_lc == "key"
        || key_lc == "oobcode"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

/// Bounded, redacted copy of a response body suitable for debug logs.
pub(crate) fn sanitize_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(MAX_SNIPPET_CHARS).collect();
        }
    }
    body.chars().take(MAX_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::{mask_email, mask_token, sanitize_body_snippet};

    #[test]
    fn mask_token_keeps_prefix_and_suffix() {
        assert_eq!(mask_token("abcdef1234567890"), "abcdef...7890");
    }

    #[test]
    fn mask_token_short_values_redacts_fully() {
        assert_eq!(mask_token("abcd"), "****");
        assert_eq!(mask_token("   "), "");
    }

    #[test]
    fn mask_email_hides_local_part() {
        assert_eq!(mask_email("ann@example.com"), "a***@example.com");
        assert_eq!(mask_email("not-an-email"), "***");
        assert_eq!(mask_email("@example.com"), "***");
    }

    #[test]
    fn snippet_masks_token_fields() {
        let raw = r#"{"idToken":"eyJhbGciOiJSUzI1NiJ9.payload","nested":{"refreshToken":"refresh-value-123"}}"#;
        let snippet = sanitize_body_snippet(raw);
        assert!(!snippet.contains("eyJhbGciOiJSUzI1NiJ9.payload"));
        assert!(!snippet.contains("refresh-value-123"));
        assert!(snippet.contains(mask_token("refresh-value-123").as_str()));
    }

    #[test]
    fn snippet_truncates_plain_text() {
        let raw = "x".repeat(2000);
        assert_eq!(sanitize_body_snippet(&raw).len(), 500);
    }
}
