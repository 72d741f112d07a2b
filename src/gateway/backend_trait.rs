//! Usage: IdentityBackend trait - the seam between session state and the hosted identity service.
//!
//! Concrete services (REST, in-memory test doubles) implement this trait; the controller only
//! talks to `&dyn IdentityBackend`.

use super::oauth::providers::{OAuthProviderConfig, OAuthProviderKey};
use super::observers::{SessionListener, Subscription};
use crate::domain::identity::UserIdentity;
use crate::shared::error::AuthResult;
use crate::shared::security::mask_email;
use std::future::Future;
use std::pin::Pin;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = AuthResult<T>> + Send + 'a>>;

/// How a user proves who they are. New popup providers extend `OAuthProviderKey`,
/// not the control flow.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod<'a> {
    Password { email: &'a str, password: &'a str },
    OAuth(OAuthProviderKey),
}

impl std::fmt::Debug for SignInMethod<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", &mask_email(email))
                .finish_non_exhaustive(),
            Self::OAuth(key) => f.debug_tuple("OAuth").field(key).finish(),
        }
    }
}

impl SignInMethod<'_> {
    pub const fn context(&self) -> &'static str {
        match self {
            Self::Password { .. } => "email_sign_in",
            Self::OAuth(key) => key.sign_in_context(),
        }
    }

    /// `method` value reported with the `login` analytics event.
    pub const fn success_method(&self) -> &'static str {
        match self {
            Self::Password { .. } => "email_signin",
            Self::OAuth(key) => key.as_str(),
        }
    }
}

pub trait IdentityBackend: Send + Sync {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity>;

    fn create_user_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity>;

    /// Set the display name of `user`; returns the refreshed snapshot.
    fn update_profile<'a>(
        &'a self,
        user: &'a UserIdentity,
        display_name: &'a str,
    ) -> BackendFuture<'a, UserIdentity>;

    /// Backend-managed OAuth popup with the provider's fixed scopes.
    fn sign_in_with_popup<'a>(
        &'a self,
        provider: &'a OAuthProviderConfig,
    ) -> BackendFuture<'a, UserIdentity>;

    fn sign_out(&self) -> BackendFuture<'_, ()>;

    fn send_password_reset_email<'a>(&'a self, email: &'a str) -> BackendFuture<'a, ()>;

    /// Attach a session-change listener. The current session is delivered once on attach.
    ///
    /// Deliveries follow the order in which the session changed. A listener may run with
    /// backend locks held and must not call back into the backend.
    fn on_session_changed(&self, listener: SessionListener) -> Subscription;

    fn sign_in<'a>(&'a self, method: SignInMethod<'a>) -> BackendFuture<'a, UserIdentity> {
        match method {
            SignInMethod::Password { email, password } => {
                self.sign_in_with_password(email, password)
            }
            SignInMethod::OAuth(key) => Box::pin(async move {
                let config = key.config();
                self.sign_in_with_popup(&config).await
            }),
        }
    }
}
