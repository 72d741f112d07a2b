//! Usage: Composition root (`AuthState`) handed to callers that need the auth controller.

use crate::app::session_controller::AuthController;
use crate::domain::analytics::{Telemetry, TracingSink};
use crate::gateway::backend_trait::IdentityBackend;
use crate::gateway::rest::IdentityToolkitBackend;
use crate::infra::settings::{self, Settings};
use crate::shared::error::AuthResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const TELEMETRY_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the controller and the background analytics queue.
///
/// Cloning the controller handle is cheap; the state itself is created once per process.
#[derive(Debug)]
pub struct AuthState {
    controller: Arc<AuthController>,
    telemetry_task: Option<JoinHandle<()>>,
}

impl AuthState {
    /// Build the REST backend and telemetry described by `settings`.
    ///
    /// Must be called inside a tokio runtime when telemetry is enabled (the queue task is spawned).
    pub fn from_settings(settings: &Settings) -> AuthResult<Self> {
        settings::validate(settings)?;
        let backend = Arc::new(IdentityToolkitBackend::new(&settings.identity)?);
        let (telemetry, telemetry_task) = if settings.telemetry.enabled {
            let (telemetry, task) =
                Telemetry::spawn_queued(Arc::new(TracingSink), settings.telemetry.queue_capacity);
            (telemetry, Some(task))
        } else {
            (Telemetry::disabled(), None)
        };
        tracing::info!(
            endpoint = %settings.identity.endpoint,
            telemetry = settings.telemetry.enabled,
            "auth state initialized"
        );
        Ok(Self {
            controller: Arc::new(AuthController::start(backend, telemetry)),
            telemetry_task,
        })
    }

    pub fn with_backend(backend: Arc<dyn IdentityBackend>, telemetry: Telemetry) -> Self {
        Self {
            controller: Arc::new(AuthController::start(backend, telemetry)),
            telemetry_task: None,
        }
    }

    pub fn controller(&self) -> Arc<AuthController> {
        Arc::clone(&self.controller)
    }

    /// Detach from the backend and give queued analytics a short window to drain.
    pub async fn shutdown(self) {
        self.controller.shutdown();
        let Self {
            controller,
            telemetry_task,
        } = self;
        drop(controller);

        let Some(task) = telemetry_task else {
            return;
        };
        match tokio::time::timeout(TELEMETRY_DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!("analytics queue task failed: {err}"),
            Err(_) => tracing::debug!("analytics queue still busy at shutdown; remaining events dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemorySink, ScriptedBackend};

    #[tokio::test]
    async fn with_backend_starts_attached_controller() {
        let backend = Arc::new(ScriptedBackend::new());
        let state = AuthState::with_backend(
            backend.clone(),
            Telemetry::direct(Arc::new(MemorySink::default())),
        );

        let controller = state.controller();
        assert!(controller.is_attached());
        assert!(!controller.snapshot().is_loading);
        assert_eq!(backend.listener_count(), 1);

        drop(controller);
        state.shutdown().await;
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn from_settings_rejects_invalid_endpoint() {
        let mut settings = Settings::default();
        settings.identity.api_key = "key".to_string();
        settings.identity.endpoint = "not a url".to_string();
        settings.telemetry.enabled = false;

        let err = AuthState::from_settings(&settings).expect_err("bad endpoint");
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[tokio::test]
    async fn from_settings_builds_with_queued_telemetry() {
        let mut settings = Settings::default();
        settings.identity.api_key = "key".to_string();

        let state = AuthState::from_settings(&settings).expect("state");
        let controller = state.controller();
        controller.telemetry().track_page_view("landing");
        assert_eq!(controller.telemetry().dropped_events(), 0);
        drop(controller);
        state.shutdown().await;
    }
}
