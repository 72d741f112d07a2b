use std::collections::HashMap;
use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use workhub_auth::IdentitySettings;

pub const TEST_API_KEY: &str = "test-api-key";

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Serializes env-touching tests and restores every variable it changed on drop.
#[allow(dead_code)]
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(&'static str, Option<OsString>)>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn new() -> Self {
        let mut guard = Self {
            _lock: env_lock(),
            saved: Vec::new(),
        };
        for key in [
            "WORKHUB_API_KEY",
            "WORKHUB_AUTH_DOMAIN",
            "WORKHUB_PROJECT_ID",
            "WORKHUB_APP_ID",
            "WORKHUB_MEASUREMENT_ID",
            "WORKHUB_IDENTITY_ENDPOINT",
            "WORKHUB_LOG",
        ] {
            guard.remove_var(key);
        }
        guard
    }

    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    pub fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    pub fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub key: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct MockAccount {
    local_id: String,
    password: String,
    display_name: Option<String>,
}

#[derive(Default)]
struct MockInner {
    accounts: HashMap<String, MockAccount>,
    // id token -> email
    tokens: HashMap<String, String>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    failures: HashMap<String, (StatusCode, String)>,
    delay: Option<Duration>,
}

type MockState = Arc<Mutex<MockInner>>;

/// Local stand-in for the identity service's `accounts:*` REST methods.
#[allow(dead_code)]
pub struct MockIdentityServer {
    addr: SocketAddr,
    state: MockState,
    task: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl MockIdentityServer {
    pub async fn start() -> Self {
        let state: MockState = Arc::default();
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock identity server");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state, task }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn settings(&self) -> IdentitySettings {
        IdentitySettings {
            api_key: TEST_API_KEY.to_string(),
            endpoint: self.endpoint(),
            request_timeout_seconds: 5,
            ..IdentitySettings::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.state.lock().expect("mock state")
    }

    pub fn add_account(&self, email: &str, password: &str, display_name: Option<&str>) {
        let mut inner = self.lock();
        inner.next_id += 1;
        let local_id = format!("local-{}", inner.next_id);
        inner.accounts.insert(
            email.to_string(),
            MockAccount {
                local_id,
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
            },
        );
    }

    /// Answer the next call to `method` with an error body carrying `message`.
    pub fn fail_next(&self, method: &str, status: StatusCode, message: &str) {
        self.lock()
            .failures
            .insert(method.to_string(), (status, message.to_string()));
    }

    pub fn delay_responses(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.lock().accounts.contains_key(email)
    }

    pub fn display_name_of(&self, email: &str) -> Option<String> {
        self.lock()
            .accounts
            .get(email)
            .and_then(|account| account.display_name.clone())
    }
}

impl Drop for MockIdentityServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
            "errors": [{ "message": message, "domain": "global", "reason": "invalid" }],
        }
    });
    (status, Json(body)).into_response()
}

fn bad_request(message: &str) -> Response {
    error_body(StatusCode::BAD_REQUEST, message)
}

fn invalid_api_key() -> Response {
    let message = "API key not valid. Please pass a valid API key.";
    let body = json!({
        "error": {
            "code": 400,
            "message": message,
            "status": "INVALID_ARGUMENT",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "API_KEY_INVALID",
                "domain": "googleapis.com",
            }],
        }
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn issue_token(inner: &mut MockInner, email: &str) -> String {
    inner.next_id += 1;
    let token = format!("id-token-{}", inner.next_id);
    inner.tokens.insert(token.clone(), email.to_string());
    token
}

async fn handle(
    State(state): State<MockState>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    raw: String,
) -> Response {
    let method = uri
        .path()
        .rsplit("accounts:")
        .next()
        .unwrap_or_default()
        .to_string();
    let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);

    let delay = {
        let mut inner = state.lock().expect("mock state");
        inner.calls.push(RecordedCall {
            method: method.clone(),
            key: query.get("key").cloned(),
            body: body.clone(),
        });
        inner.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut inner = state.lock().expect("mock state");
    if let Some((status, message)) = inner.failures.remove(&method) {
        return error_body(status, &message);
    }
    if query.get("key").map(String::as_str) != Some(TEST_API_KEY) {
        return invalid_api_key();
    }

    match method.as_str() {
        "signInWithPassword" => {
            let email = str_field(&body, "email");
            if email.is_empty() {
                return bad_request("MISSING_EMAIL");
            }
            let Some(account) = inner.accounts.get(email).cloned() else {
                return bad_request("EMAIL_NOT_FOUND");
            };
            if account.password != str_field(&body, "password") {
                return bad_request("INVALID_PASSWORD");
            }
            let token = issue_token(&mut inner, email);
            Json(json!({
                "localId": account.local_id,
                "email": email,
                "idToken": token,
                "refreshToken": "refresh",
                "expiresIn": "3600",
                "registered": true,
            }))
            .into_response()
        }
        "signUp" => {
            let email = str_field(&body, "email").to_string();
            let password = str_field(&body, "password").to_string();
            if inner.accounts.contains_key(&email) {
                return bad_request("EMAIL_EXISTS");
            }
            if password.len() < 6 {
                return bad_request("WEAK_PASSWORD : Password should be at least 6 characters");
            }
            inner.next_id += 1;
            let local_id = format!("local-{}", inner.next_id);
            inner.accounts.insert(
                email.clone(),
                MockAccount {
                    local_id: local_id.clone(),
                    password,
                    display_name: None,
                },
            );
            let token = issue_token(&mut inner, &email);
            Json(json!({
                "localId": local_id,
                "email": email,
                "idToken": token,
                "refreshToken": "refresh",
                "expiresIn": "3600",
            }))
            .into_response()
        }
        "lookup" => {
            let Some(email) = inner.tokens.get(str_field(&body, "idToken")).cloned() else {
                return bad_request("INVALID_ID_TOKEN");
            };
            let Some(account) = inner.accounts.get(&email) else {
                return bad_request("USER_NOT_FOUND");
            };
            Json(json!({
                "users": [{
                    "localId": account.local_id,
                    "email": email,
                    "displayName": account.display_name,
                    "emailVerified": false,
                }]
            }))
            .into_response()
        }
        "update" => {
            let Some(email) = inner.tokens.get(str_field(&body, "idToken")).cloned() else {
                return bad_request("INVALID_ID_TOKEN");
            };
            let display_name = str_field(&body, "displayName").to_string();
            let Some(account) = inner.accounts.get_mut(&email) else {
                return bad_request("USER_NOT_FOUND");
            };
            account.display_name = Some(display_name.clone());
            let local_id = account.local_id.clone();
            let token = issue_token(&mut inner, &email);
            Json(json!({
                "localId": local_id,
                "email": email,
                "displayName": display_name,
                "idToken": token,
            }))
            .into_response()
        }
        "sendOobCode" => {
            let email = str_field(&body, "email");
            if email.is_empty() {
                return bad_request("MISSING_EMAIL");
            }
            Json(json!({ "email": email })).into_response()
        }
        _ => error_body(StatusCode::NOT_FOUND, "UNKNOWN_METHOD"),
    }
}
