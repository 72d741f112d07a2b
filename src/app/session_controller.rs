//! Usage: AuthController - the single writer of `SessionState`.
//!
//! Every operation follows `idle -> loading -> idle`, storing a normalized message on failure
//! and handing the original error back to the caller. Overlapping operations are ordered by a
//! generation counter: only the most recently started operation may write `is_loading` and
//! `last_error`; results of superseded operations still reach their own callers.

use crate::domain::analytics::Telemetry;
use crate::domain::auth_errors;
use crate::domain::identity::{SessionState, UserIdentity};
use crate::gateway::backend_trait::{IdentityBackend, SignInMethod};
use crate::gateway::oauth::providers::OAuthProviderKey;
use crate::gateway::observers::{SessionListener, Subscription};
use crate::shared::error::{AuthError, AuthResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::security::mask_email;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const CONTEXT_EMAIL_SIGN_UP: &str = "email_sign_up";
pub const CONTEXT_SIGN_OUT: &str = "sign_out";
pub const CONTEXT_PASSWORD_RESET: &str = "password_reset_request";

#[derive(Debug, Default)]
struct Progress {
    generation: u64,
    active: Option<u64>,
    session_resolved: bool,
    // Bumped on every backend session notification.
    session_epoch: u64,
}

/// State shared between the controller and the session listener it registers.
struct Shared {
    progress: Mutex<Progress>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn begin(&self) -> u64 {
        let mut progress = self.progress.lock_or_recover();
        progress.generation = progress.generation.wrapping_add(1);
        let generation = progress.generation;
        progress.active = Some(generation);
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.last_error = None;
        });
        generation
    }

    /// Close out `generation`; `None` error means success. Returns false for superseded operations.
    fn finish(&self, generation: u64, error_message: Option<String>) -> bool {
        let mut progress = self.progress.lock_or_recover();
        if progress.active != Some(generation) {
            tracing::debug!(
                generation,
                latest = progress.generation,
                "superseded auth operation finished; state left untouched"
            );
            return false;
        }
        progress.active = None;
        let still_resolving = !progress.session_resolved;
        self.state.send_modify(|state| {
            state.is_loading = still_resolving;
            if error_message.is_some() {
                state.last_error = error_message;
            }
        });
        true
    }

    fn apply_session(&self, user: Option<UserIdentity>) {
        let mut progress = self.progress.lock_or_recover();
        progress.session_resolved = true;
        progress.session_epoch = progress.session_epoch.wrapping_add(1);
        let busy = progress.active.is_some();
        self.state.send_modify(|state| {
            state.user = user;
            state.is_loading = busy;
        });
    }

    fn session_epoch(&self) -> u64 {
        self.progress.with_locked(|progress| progress.session_epoch)
    }

    /// Clear `user` unless the backend has announced a session since `epoch`; a notification
    /// is always the fresher view.
    fn clear_user_since(&self, epoch: u64) {
        let progress = self.progress.lock_or_recover();
        if progress.session_epoch != epoch {
            return;
        }
        self.state.send_if_modified(|state| state.user.take().is_some());
    }

    fn clear_error(&self) {
        self.state
            .send_if_modified(|state| state.last_error.take().is_some());
    }
}

pub struct AuthController {
    backend: Arc<dyn IdentityBackend>,
    telemetry: Telemetry,
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("state", &*self.shared.state.borrow())
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl AuthController {
    /// Create the session state and attach to the backend's session notifications.
    pub fn start(backend: Arc<dyn IdentityBackend>, telemetry: Telemetry) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let shared = Arc::new(Shared {
            progress: Mutex::new(Progress::default()),
            state,
        });

        let listener_shared = Arc::clone(&shared);
        let listener: SessionListener = Arc::new(move |user: Option<UserIdentity>| {
            listener_shared.apply_session(user);
        });
        let subscription = backend.on_session_changed(listener);
        tracing::debug!("auth controller attached to session notifications");

        Self {
            backend,
            telemetry,
            shared,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Detach from session notifications. Later calls are no-ops.
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.lock_or_recover().take() {
            subscription.unsubscribe();
            tracing::debug!("auth controller detached from session notifications");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.with_locked(|subscription| subscription.is_some())
    }

    pub fn snapshot(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Read-only view for UI code; receivers see every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn clear_error(&self) {
        self.shared.clear_error();
    }

    fn fail(&self, generation: u64, err: AuthError, context: &str) -> AuthError {
        let message = auth_errors::normalize(&err, context, &self.telemetry);
        self.shared.finish(generation, Some(message));
        err
    }

    /// Shared control flow for every sign-in capability.
    pub async fn sign_in_with(&self, method: SignInMethod<'_>) -> AuthResult<()> {
        let context = method.context();
        let generation = self.shared.begin();
        if let SignInMethod::Password { email, .. } = method {
            tracing::info!(context, email = %mask_email(email), "sign-in started");
        } else {
            tracing::info!(context, "sign-in started");
        }

        match self.backend.sign_in(method).await {
            Ok(user) => {
                tracing::info!(context, uid = %user.id, "sign-in succeeded");
                self.telemetry
                    .track_auth_success(method.success_method(), serde_json::Value::Null);
                self.telemetry
                    .track_user_action(context, serde_json::Value::Null);
                self.shared.finish(generation, None);
                Ok(())
            }
            Err(err) => Err(self.fail(generation, err, context)),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        self.sign_in_with(SignInMethod::Password { email, password })
            .await
    }

    pub async fn sign_in_with_provider(&self, provider: OAuthProviderKey) -> AuthResult<()> {
        self.sign_in_with(SignInMethod::OAuth(provider)).await
    }

    pub async fn sign_in_with_google(&self) -> AuthResult<()> {
        self.sign_in_with_provider(OAuthProviderKey::Google).await
    }

    pub async fn sign_in_with_github(&self) -> AuthResult<()> {
        self.sign_in_with_provider(OAuthProviderKey::Github).await
    }

    /// Create an account, then set its display name when one is given.
    ///
    /// A failed profile update fails the whole operation; the created account is kept.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<()> {
        let generation = self.shared.begin();
        tracing::info!(email = %mask_email(email), "sign-up started");

        let result = async {
            let user = self
                .backend
                .create_user_with_password(email, password)
                .await?;
            if let Some(name) = display_name.filter(|name| !name.is_empty()) {
                self.backend
                    .update_profile(&user, name)
                    .await
                    .inspect_err(|_| {
                        tracing::warn!(
                            uid = %user.id,
                            "account created but profile update failed; account kept"
                        );
                    })?;
            }
            Ok::<_, AuthError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                tracing::info!(uid = %user.id, "sign-up succeeded");
                let with_display_name = display_name.is_some_and(|name| !name.is_empty());
                self.telemetry.track_auth_success(
                    "email_signup",
                    serde_json::json!({ "with_display_name": with_display_name }),
                );
                self.telemetry
                    .track_user_action(CONTEXT_EMAIL_SIGN_UP, serde_json::Value::Null);
                self.shared.finish(generation, None);
                Ok(())
            }
            Err(err) => Err(self.fail(generation, err, CONTEXT_EMAIL_SIGN_UP)),
        }
    }

    pub async fn log_out(&self) -> AuthResult<()> {
        let generation = self.shared.begin();
        let epoch = self.shared.session_epoch();
        match self.backend.sign_out().await {
            Ok(()) => {
                tracing::info!("signed out");
                self.shared.clear_user_since(epoch);
                self.telemetry
                    .track_user_action(CONTEXT_SIGN_OUT, serde_json::Value::Null);
                self.shared.finish(generation, None);
                Ok(())
            }
            Err(err) => Err(self.fail(generation, err, CONTEXT_SIGN_OUT)),
        }
    }

    /// Ask the backend to send a reset email. Delivery to the mailbox cannot be confirmed.
    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        let generation = self.shared.begin();
        match self.backend.send_password_reset_email(email).await {
            Ok(()) => {
                tracing::info!(email = %mask_email(email), "password reset requested");
                self.telemetry
                    .track_user_action(CONTEXT_PASSWORD_RESET, serde_json::Value::Null);
                self.shared.finish(generation, None);
                Ok(())
            }
            Err(err) => Err(self.fail(generation, err, CONTEXT_PASSWORD_RESET)),
        }
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
