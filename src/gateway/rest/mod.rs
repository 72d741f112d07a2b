//! Usage: IdentityBackend over the hosted identity service's REST API (`accounts:*` methods).
//!
//! The signed-in session lives in memory for the lifetime of the backend; every change is
//! fanned out through `SessionObservers` while the session lock is held, so listeners observe
//! changes in the order they were stored. Listeners must not call back into the backend.

mod errors;

use super::backend_trait::{BackendFuture, IdentityBackend};
use super::oauth::providers::OAuthProviderConfig;
use super::observers::{SessionListener, SessionObservers, Subscription};
use crate::domain::identity::UserIdentity;
use crate::infra::settings::IdentitySettings;
use crate::shared::error::{AuthError, AuthResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::security::{mask_email, mask_token, sanitize_body_snippet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

const PASSWORD_PROVIDER_ID: &str = "password";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct RestSession {
    user: UserIdentity,
    id_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

pub struct IdentityToolkitBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    session: Mutex<Option<RestSession>>,
    observers: SessionObservers,
}

impl std::fmt::Debug for IdentityToolkitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &mask_token(&self.api_key))
            .finish()
    }
}

fn http_client(request_timeout: Duration) -> AuthResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("workhub-auth/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| format!("SYSTEM_ERROR: identity http client init failed: {e}").into())
}

impl IdentityToolkitBackend {
    pub fn new(settings: &IdentitySettings) -> AuthResult<Self> {
        let client = http_client(Duration::from_secs(u64::from(
            settings.request_timeout_seconds,
        )))?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: reqwest::Client, settings: &IdentitySettings) -> Self {
        Self {
            client,
            endpoint: settings.endpoint.trim().trim_end_matches('/').to_string(),
            api_key: settings.api_key.trim().to_string(),
            session: Mutex::new(None),
            observers: SessionObservers::new(),
        }
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.session
            .lock_or_recover()
            .as_ref()
            .map(|session| session.user.clone())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/accounts:{method}", self.endpoint)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> AuthResult<T> {
        let payload = serde_json::to_vec(&body)
            .map_err(|e| format!("SYSTEM_ERROR: identity request encode failed: {e}"))?;
        let response = self
            .client
            .post(self.method_url(method))
            .query(&[("key", self.api_key.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| errors::from_transport(method, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| errors::from_transport(method, e))?;

        if !status.is_success() {
            let err = errors::from_response(status, &text);
            tracing::debug!(
                method,
                status = status.as_u16(),
                code = %err.code(),
                body = %sanitize_body_snippet(&text),
                "identity request rejected"
            );
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            AuthError::new(
                "auth/internal-error",
                format!("{method} response json invalid: {e}"),
            )
        })
    }

    async fn lookup(&self, id_token: &str, expected_id: &str) -> AuthResult<UserIdentity> {
        let response: LookupResponse = self
            .call("lookup", serde_json::json!({ "idToken": id_token }))
            .await?;
        let found = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::new("auth/user-not-found", "lookup returned no users"))?;
        if found.local_id != expected_id {
            tracing::warn!("identity lookup returned a different account than the token exchange");
        }
        Ok(UserIdentity {
            id: found.local_id,
            email: found.email,
            display_name: found.display_name,
            email_verified: found.email_verified,
            provider_id: PASSWORD_PROVIDER_ID.to_string(),
        })
    }

    async fn establish_session(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<UserIdentity> {
        let tokens: TokenResponse = self
            .call(
                method,
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        let user = self.lookup(&tokens.id_token, &tokens.local_id).await?;
        tracing::info!(
            method,
            email = %mask_email(email),
            uid = %user.id,
            "identity session established"
        );
        self.replace_session(Some(RestSession {
            user: user.clone(),
            id_token: tokens.id_token,
        }));
        Ok(user)
    }

    /// Swap the session and notify listeners before releasing the lock. Returns the old session.
    fn replace_session(&self, next: Option<RestSession>) -> Option<RestSession> {
        let user = next.as_ref().map(|session| session.user.clone());
        let mut session = self.session.lock_or_recover();
        let previous = std::mem::replace(&mut *session, next);
        self.observers.notify(user);
        previous
    }

    async fn update_display_name(
        &self,
        user: &UserIdentity,
        display_name: &str,
    ) -> AuthResult<UserIdentity> {
        let session = self
            .session
            .lock_or_recover()
            .clone()
            .filter(|session| session.user.id == user.id)
            .ok_or_else(|| {
                AuthError::new(
                    "auth/user-mismatch",
                    "profile update target is not the signed-in user",
                )
            })?;

        let response: UpdateResponse = self
            .call(
                "update",
                serde_json::json!({
                    "idToken": session.id_token,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let updated = UserIdentity {
            display_name: response
                .display_name
                .or_else(|| Some(display_name.to_string())),
            ..session.user.clone()
        };
        let mut current = self.session.lock_or_recover();
        // Skip if signed out or switched accounts while the update was in flight.
        if current.as_ref().is_some_and(|c| c.user.id == updated.id) {
            *current = Some(RestSession {
                user: updated.clone(),
                id_token: response.id_token.unwrap_or(session.id_token),
            });
            self.observers.notify(Some(updated.clone()));
        }
        Ok(updated)
    }
}

impl IdentityBackend for IdentityToolkitBackend {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.establish_session("signInWithPassword", email, password))
    }

    fn create_user_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.establish_session("signUp", email, password))
    }

    fn update_profile<'a>(
        &'a self,
        user: &'a UserIdentity,
        display_name: &'a str,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(self.update_display_name(user, display_name))
    }

    fn sign_in_with_popup<'a>(
        &'a self,
        provider: &'a OAuthProviderConfig,
    ) -> BackendFuture<'a, UserIdentity> {
        Box::pin(async move {
            Err(AuthError::new(
                "auth/operation-not-supported-in-this-environment",
                format!(
                    "{} popup sign-in needs a browser; the REST backend cannot open one",
                    provider.display_name
                ),
            ))
        })
    }

    fn sign_out(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let had_session = self.replace_session(None).is_some();
            tracing::info!(had_session, "identity session cleared");
            Ok(())
        })
    }

    fn send_password_reset_email<'a>(&'a self, email: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let _: Value = self
                .call(
                    "sendOobCode",
                    serde_json::json!({
                        "requestType": "PASSWORD_RESET",
                        "email": email,
                    }),
                )
                .await?;
            tracing::info!(email = %mask_email(email), "password reset email requested");
            Ok(())
        })
    }

    fn on_session_changed(&self, listener: SessionListener) -> Subscription {
        let session = self.session.lock_or_recover();
        let current = session.as_ref().map(|session| session.user.clone());
        self.observers.subscribe(listener, current)
    }
}
