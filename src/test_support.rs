//! Usage: Public test helpers (scripted identity backend, recording analytics sink).

use crate::domain::analytics::{TelemetryEvent, TelemetrySink};
use crate::domain::identity::UserIdentity;
use crate::gateway::backend_trait::{BackendFuture, IdentityBackend};
use crate::gateway::oauth::providers::OAuthProviderConfig;
use crate::gateway::observers::{SessionListener, SessionObservers, Subscription};
use crate::shared::error::{AuthError, AuthResult};
use crate::shared::mutex_ext::MutexExt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    SignInWithPassword,
    CreateUser,
    UpdateProfile,
    Popup,
    SignOut,
    PasswordReset,
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: UserIdentity,
}

/// In-memory identity backend with scriptable failures and hold points.
///
/// Behaves like the hosted service for the happy path: accounts are keyed by email, the signed-in
/// user is notified to listeners before an operation resolves.
#[derive(Default)]
pub struct ScriptedBackend {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<UserIdentity>>,
    observers: SessionObservers,
    failures: Mutex<HashMap<BackendOp, VecDeque<AuthError>>>,
    holds: Mutex<HashMap<BackendOp, VecDeque<oneshot::Receiver<()>>>>,
    calls: Mutex<Vec<BackendOp>>,
    next_uid: AtomicU64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing password account.
    pub fn with_account(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        let user = UserIdentity {
            id: self.allocate_uid(),
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
            email_verified: true,
            provider_id: "password".to_string(),
        };
        self.accounts.lock_or_recover().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user,
            },
        );
        self
    }

    /// Start with `email` already signed in (restored session).
    pub fn with_signed_in(self, email: &str) -> Self {
        let user = self.account(email);
        *self.current.lock_or_recover() = user;
        self
    }

    /// Make the next call of `op` fail with `err`. Failures queue up in order.
    pub fn fail_next(&self, op: BackendOp, err: AuthError) {
        self.failures
            .lock_or_recover()
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Park the next call of `op` until the returned sender fires (or is dropped).
    pub fn hold_next(&self, op: BackendOp) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.holds
            .lock_or_recover()
            .entry(op)
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn calls(&self, op: BackendOp) -> usize {
        self.calls
            .lock_or_recover()
            .iter()
            .filter(|call| **call == op)
            .count()
    }

    pub fn account(&self, email: &str) -> Option<UserIdentity> {
        self.accounts
            .lock_or_recover()
            .get(email)
            .map(|account| account.user.clone())
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.current.lock_or_recover().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.observers.listener_count()
    }

    /// Simulate a session change originating outside the controller (another tab, expiry).
    pub fn push_session(&self, user: Option<UserIdentity>) {
        self.set_current(user);
    }

    fn allocate_uid(&self) -> String {
        format!("uid-{}", self.next_uid.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Store and announce under one lock so listeners see changes in store order.
    fn set_current(&self, user: Option<UserIdentity>) {
        let mut current = self.current.lock_or_recover();
        *current = user.clone();
        self.observers.notify(user);
    }

    async fn enter(&self, op: BackendOp) -> AuthResult<()> {
        self.calls.with_locked(|calls| calls.push(op));
        let hold = self
            .holds
            .lock_or_recover()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        let failure = self
            .failures
            .lock_or_recover()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn password_sign_in(&self, email: &str, password: &str) -> AuthResult<UserIdentity> {
        self.enter(BackendOp::SignInWithPassword).await?;
        let account = self
            .accounts
            .lock_or_recover()
            .get(email)
            .cloned()
            .ok_or_else(|| AuthError::new("auth/user-not-found", "EMAIL_NOT_FOUND"))?;
        if account.password != password {
            return Err(AuthError::new("auth/wrong-password", "INVALID_PASSWORD"));
        }
        self.set_current(Some(account.user.clone()));
        Ok(account.user)
    }

    async fn create_user(&self, email: &str, password: &str) -> AuthResult<UserIdentity> {
        self.enter(BackendOp::CreateUser).await?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::new(
                "auth/weak-password",
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }
        let user = {
            let mut accounts = self.accounts.lock_or_recover();
            if accounts.contains_key(email) {
                return Err(AuthError::new("auth/email-already-in-use", "EMAIL_EXISTS"));
            }
            let user = UserIdentity {
                id: self.allocate_uid(),
                email: Some(email.to_string()),
                display_name: None,
                email_verified: false,
                provider_id: "password".to_string(),
            };
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn rename(&self, user: &UserIdentity, display_name: &str) -> AuthResult<UserIdentity> {
        self.enter(BackendOp::UpdateProfile).await?;
        let updated = UserIdentity {
            display_name: Some(display_name.to_string()),
            ..user.clone()
        };
        if let Some(account) = self
            .accounts
            .lock_or_recover()
            .values_mut()
            .find(|account| account.user.id == user.id)
        {
            account.user = updated.clone();
        }
        let mut current = self.current.lock_or_recover();
        if current.as_ref().is_some_and(|current| current.id == user.id) {
            *current = Some(updated.clone());
            self.observers.notify(Some(updated.clone()));
        }
        Ok(updated)
    }

    async fn popup(&self, provider: &OAuthProviderConfig) -> AuthResult<UserIdentity> {
        self.enter(BackendOp::Popup).await?;
        let name = provider.key.as_str();
        let user = UserIdentity {
            id: format!("{name}-uid"),
            email: Some(format!("{name}.user@example.com")),
            display_name: Some(format!("{} User", provider.display_name)),
            email_verified: true,
            provider_id: provider.provider_id.to_string(),
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }
}

impl IdentityBackend for ScriptedBackend {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.password_sign_in(email, password))
    }

    fn create_user_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.create_user(email, password))
    }

    fn update_profile<'a>(
        &'a self,
        user: &'a UserIdentity,
        display_name: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.rename(user, display_name))
    }

    fn sign_in_with_popup<'a>(
        &'a self,
        provider: &'a OAuthProviderConfig,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.popup(provider))
    }

    fn sign_out(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            self.enter(BackendOp::SignOut).await?;
            self.set_current(None);
            Ok(())
        })
    }

    fn send_password_reset_email<'a>(&'a self, _email: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(self.enter(BackendOp::PasswordReset))
    }

    fn on_session_changed(&self, listener: SessionListener) -> Subscription {
        let current = self.current.lock_or_recover();
        self.observers.subscribe(listener, current.clone())
    }
}

/// Analytics sink that records every delivered event; optionally rejects them all.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
    reject: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock_or_recover().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock_or_recover()
            .iter()
            .map(|event| event.name.clone())
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn deliver(&self, event: &TelemetryEvent) -> AuthResult<()> {
        if self.reject {
            return Err(AuthError::new("TELEMETRY_UNAVAILABLE", "sink rejected event"));
        }
        self.events.lock_or_recover().push(event.clone());
        Ok(())
    }
}
