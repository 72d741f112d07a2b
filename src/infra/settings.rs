//! Usage: Identity/telemetry/logging settings (TOML schema, env overrides, sanitize + validate).

use crate::shared::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u32 = 20;
const MIN_REQUEST_TIMEOUT_SECONDS: u32 = 1;
const MAX_REQUEST_TIMEOUT_SECONDS: u32 = 5 * 60;
pub const DEFAULT_TELEMETRY_QUEUE_CAPACITY: usize = 256;
const MAX_TELEMETRY_QUEUE_CAPACITY: usize = 64 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "workhub_auth=info,warn";

pub const ENV_API_KEY: &str = "WORKHUB_API_KEY";
pub const ENV_AUTH_DOMAIN: &str = "WORKHUB_AUTH_DOMAIN";
pub const ENV_PROJECT_ID: &str = "WORKHUB_PROJECT_ID";
pub const ENV_APP_ID: &str = "WORKHUB_APP_ID";
pub const ENV_MEASUREMENT_ID: &str = "WORKHUB_MEASUREMENT_ID";
pub const ENV_IDENTITY_ENDPOINT: &str = "WORKHUB_IDENTITY_ENDPOINT";
pub const ENV_LOG: &str = "WORKHUB_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: String,
    // Base URL of the `accounts:*` REST methods; overridable for emulators.
    pub endpoint: String,
    pub request_timeout_seconds: u32,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            measurement_id: String::new(),
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    pub queue_capacity: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: DEFAULT_TELEMETRY_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
    // Daily rolling log files go here when set; stderr only otherwise.
    pub directory: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub identity: IdentitySettings,
    pub telemetry: TelemetrySettings,
    pub logging: LoggingSettings,
}

fn trim_in_place(value: &mut String) -> bool {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        return false;
    }
    *value = trimmed.to_string();
    true
}

/// Clamp out-of-range values back to something usable. Returns whether anything changed.
pub fn sanitize(settings: &mut Settings) -> bool {
    let mut changed = false;

    let identity = &mut settings.identity;
    for field in [
        &mut identity.api_key,
        &mut identity.auth_domain,
        &mut identity.project_id,
        &mut identity.storage_bucket,
        &mut identity.messaging_sender_id,
        &mut identity.app_id,
        &mut identity.measurement_id,
        &mut identity.endpoint,
    ] {
        changed |= trim_in_place(field);
    }

    let endpoint = identity.endpoint.trim_end_matches('/');
    if endpoint.is_empty() {
        identity.endpoint = DEFAULT_IDENTITY_ENDPOINT.to_string();
        changed = true;
    } else if endpoint.len() != identity.endpoint.len() {
        identity.endpoint = endpoint.to_string();
        changed = true;
    }

    if identity.request_timeout_seconds < MIN_REQUEST_TIMEOUT_SECONDS {
        identity.request_timeout_seconds = DEFAULT_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }
    if identity.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS {
        identity.request_timeout_seconds = MAX_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }

    let telemetry = &mut settings.telemetry;
    if telemetry.queue_capacity == 0 {
        telemetry.queue_capacity = DEFAULT_TELEMETRY_QUEUE_CAPACITY;
        changed = true;
    }
    if telemetry.queue_capacity > MAX_TELEMETRY_QUEUE_CAPACITY {
        telemetry.queue_capacity = MAX_TELEMETRY_QUEUE_CAPACITY;
        changed = true;
    }

    let logging = &mut settings.logging;
    if logging.filter.trim().is_empty() {
        logging.filter = DEFAULT_LOG_FILTER.to_string();
        changed = true;
    }
    if logging
        .directory
        .as_deref()
        .is_some_and(|dir| dir.trim().is_empty())
    {
        logging.directory = None;
        changed = true;
    }

    changed
}

/// Reject settings the identity backend cannot work with.
pub fn validate(settings: &Settings) -> AuthResult<()> {
    if settings.identity.api_key.trim().is_empty() {
        return Err(AuthError::new(
            "CONFIG_INVALID",
            format!("identity.api_key is empty (set it in the config file or {ENV_API_KEY})"),
        ));
    }
    let endpoint = settings.identity.endpoint.as_str();
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err(AuthError::new(
            "CONFIG_INVALID",
            format!("identity.endpoint must be an http(s) url, got {endpoint:?}"),
        ));
    }
    Ok(())
}

/// Apply overrides from `lookup` (normally `std::env::var`). Returns whether anything changed.
pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> bool {
    let mut changed = false;
    let identity = &mut settings.identity;
    let targets: [(&str, &mut String); 6] = [
        (ENV_API_KEY, &mut identity.api_key),
        (ENV_AUTH_DOMAIN, &mut identity.auth_domain),
        (ENV_PROJECT_ID, &mut identity.project_id),
        (ENV_APP_ID, &mut identity.app_id),
        (ENV_MEASUREMENT_ID, &mut identity.measurement_id),
        (ENV_IDENTITY_ENDPOINT, &mut identity.endpoint),
    ];
    for (key, field) in targets {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            *field = value;
            changed = true;
        }
    }
    if let Some(filter) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
        settings.logging.filter = filter;
        changed = true;
    }
    changed
}

pub fn parse(raw: &str) -> AuthResult<Settings> {
    toml::from_str(raw)
        .map_err(|e| AuthError::new("CONFIG_INVALID", format!("settings toml invalid: {e}")))
}

/// Read settings: file (optional) -> env overrides -> sanitize -> validate.
pub fn load(path: Option<&Path>) -> AuthResult<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                AuthError::new(
                    "CONFIG_READ",
                    format!("failed to read {}: {e}", path.display()),
                )
                .with_source(e)
            })?;
            parse(&raw)?
        }
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    if sanitize(&mut settings) {
        tracing::debug!("settings sanitized");
    }
    validate(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_hosted_service() {
        let settings = Settings::default();
        assert_eq!(settings.identity.endpoint, DEFAULT_IDENTITY_ENDPOINT);
        assert_eq!(settings.identity.request_timeout_seconds, 20);
        assert!(settings.telemetry.enabled);
        assert_eq!(settings.logging.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings = parse(
            r#"
            [identity]
            api_key = "AIzaTest"
            project_id = "workhub-demo"
            "#,
        )
        .expect("parse");
        assert_eq!(settings.identity.api_key, "AIzaTest");
        assert_eq!(settings.identity.project_id, "workhub-demo");
        assert_eq!(settings.identity.endpoint, DEFAULT_IDENTITY_ENDPOINT);
        assert_eq!(settings.telemetry.queue_capacity, DEFAULT_TELEMETRY_QUEUE_CAPACITY);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = parse("identity = 3").expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn sanitize_clamps_and_trims() {
        let mut settings = Settings::default();
        settings.identity.api_key = "  key  ".to_string();
        settings.identity.endpoint = "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/".to_string();
        settings.identity.request_timeout_seconds = 0;
        settings.telemetry.queue_capacity = usize::MAX;
        settings.logging.directory = Some("  ".to_string());

        assert!(sanitize(&mut settings));
        assert_eq!(settings.identity.api_key, "key");
        assert_eq!(
            settings.identity.endpoint,
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(settings.identity.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
        assert_eq!(settings.telemetry.queue_capacity, 64 * 1024);
        assert_eq!(settings.logging.directory, None);
        assert!(!sanitize(&mut settings));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "from-env"),
            (ENV_LOG, "debug"),
            (ENV_PROJECT_ID, "  "),
        ]);
        let mut settings = Settings::default();
        settings.identity.project_id = "from-file".to_string();

        assert!(apply_env_overrides(&mut settings, |key| env
            .get(key)
            .map(|v| v.to_string())));
        assert_eq!(settings.identity.api_key, "from-env");
        assert_eq!(settings.identity.project_id, "from-file");
        assert_eq!(settings.logging.filter, "debug");
    }

    #[test]
    fn validate_requires_api_key_and_http_endpoint() {
        let mut settings = Settings::default();
        assert_eq!(validate(&settings).expect_err("no key").code(), "CONFIG_INVALID");

        settings.identity.api_key = "key".to_string();
        settings.identity.endpoint = "ftp://example.com".to_string();
        assert!(validate(&settings).is_err());

        settings.identity.endpoint = DEFAULT_IDENTITY_ENDPOINT.to_string();
        assert!(validate(&settings).is_ok());
    }
}
