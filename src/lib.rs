//! Usage: workhub-auth crate root - session state controller and auth error normalization.

mod app;
pub mod commands;
mod domain;
mod gateway;
mod infra;
mod shared;
pub mod test_support;

pub use app::app_state::AuthState;
pub use app::logging;
pub use app::session_controller::{
    AuthController, CONTEXT_EMAIL_SIGN_UP, CONTEXT_PASSWORD_RESET, CONTEXT_SIGN_OUT,
};
pub use domain::analytics::{
    AnalyticsEvent, NoopSink, Telemetry, TelemetryEvent, TelemetrySink, TracingSink,
    DEFAULT_QUEUE_CAPACITY,
};
pub use domain::auth_errors::{
    display_message_for, kind_of, normalize, AuthErrorCode, ErrorKind, HelpTopic,
    UNEXPECTED_ERROR_MESSAGE,
};
pub use domain::identity::{AccessRequirement, ErrorRecord, RouteAccess, SessionState, UserIdentity};
pub use gateway::oauth::providers::{
    OAuthProviderConfig, OAuthProviderKey, GITHUB_CONFIG, GOOGLE_CONFIG,
};
pub use gateway::oauth::registry::{global_registry, OAuthProviderRegistry};
pub use gateway::{
    BackendFuture, IdentityBackend, IdentityToolkitBackend, SessionListener, SessionObservers,
    SignInMethod, Subscription,
};
pub use infra::settings::{self, IdentitySettings, LoggingSettings, Settings, TelemetrySettings};
pub use shared::error::{AuthError, AuthResult};
