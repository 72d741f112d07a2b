//! Usage: Auth diagnostic commands (run one operation, report the resulting session as JSON).

use crate::app::session_controller::AuthController;
use crate::domain::auth_errors::{self, AuthErrorCode, ErrorKind, HelpTopic};
use crate::domain::identity::SessionState;
use crate::gateway::oauth::registry::global_registry;
use crate::shared::error::{AuthError, AuthResult};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
    pub retryable: bool,
    pub help: Option<HelpTopic>,
}

impl ErrorReport {
    pub fn from_error(err: &AuthError) -> Self {
        let kind = auth_errors::kind_of(err);
        Self {
            code: err.code().to_string(),
            message: auth_errors::display_message_for(err),
            kind,
            retryable: kind.is_retryable(),
            help: AuthErrorCode::from_str(err.code()).and_then(AuthErrorCode::help_topic),
        }
    }
}

/// Result of one diagnostic operation: the session afterwards plus the failure, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub operation: &'static str,
    pub ok: bool,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

fn report(operation: &'static str, controller: &AuthController, result: AuthResult<()>) -> CommandReport {
    CommandReport {
        operation,
        ok: result.is_ok(),
        state: controller.snapshot(),
        error: result.err().as_ref().map(ErrorReport::from_error),
    }
}

pub async fn sign_in(controller: &AuthController, email: &str, password: &str) -> CommandReport {
    let result = controller.sign_in(email, password).await;
    report("sign_in", controller, result)
}

pub async fn sign_up(
    controller: &AuthController,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> CommandReport {
    let result = controller.sign_up(email, password, display_name).await;
    report("sign_up", controller, result)
}

/// Popup sign-in by provider name (`google`, `github`).
pub async fn sign_in_with_provider(controller: &AuthController, name: &str) -> CommandReport {
    let result = match global_registry().get_by_name(name) {
        Some(config) => controller.sign_in_with_provider(config.key).await,
        None => Err(AuthError::new(
            "UNKNOWN_PROVIDER",
            format!(
                "unknown provider {name:?}; expected one of {}",
                global_registry().names().join(", ")
            ),
        )),
    };
    report("sign_in_with_provider", controller, result)
}

pub async fn reset_password(controller: &AuthController, email: &str) -> CommandReport {
    let result = controller.reset_password(email).await;
    report("reset_password", controller, result)
}

pub async fn sign_out(controller: &AuthController) -> CommandReport {
    let result = controller.log_out().await;
    report("sign_out", controller, result)
}

/// Explain a backend error code without contacting the backend.
pub fn explain(code: &str) -> ErrorReport {
    let code = code.trim();
    ErrorReport::from_error(&AuthError::new(code, format!("{code} (explained locally)")))
}
