//! Usage: Best-effort analytics events (event names, sinks, fire-and-forget dispatch).

use crate::domain::identity::ErrorRecord;
use crate::shared::error::AuthResult;
use serde::Serialize;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticsEvent {
    Login,
    SignUp,
    Logout,
    PasswordReset,
    ButtonClick,
    FormSubmit,
    Search,
    FeatureUse,
    SettingsChange,
    Error,
    Exception,
    PageView,
    ScreenView,
    CustomEvent,
}

impl AnalyticsEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::SignUp => "sign_up",
            Self::Logout => "logout",
            Self::PasswordReset => "password_reset",
            Self::ButtonClick => "button_click",
            Self::FormSubmit => "form_submit",
            Self::Search => "search",
            Self::FeatureUse => "feature_use",
            Self::SettingsChange => "settings_change",
            Self::Error => "error",
            Self::Exception => "exception",
            Self::PageView => "page_view",
            Self::ScreenView => "screen_view",
            Self::CustomEvent => "custom_event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub params: Map<String, Value>,
}

impl TelemetryEvent {
    pub fn new(event: AnalyticsEvent, params: Value) -> Self {
        Self {
            name: event.as_str().to_string(),
            params: into_params(params),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

fn into_params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn merge_params(mut base: Map<String, Value>, extra: Value) -> Map<String, Value> {
    for (key, value) in into_params(extra) {
        base.insert(key, value);
    }
    base
}

/// Destination for analytics events. Delivery failures are never surfaced to auth flows.
pub trait TelemetrySink: Send + Sync {
    fn deliver(&self, event: &TelemetryEvent) -> AuthResult<()>;
}

/// Writes each event as a structured `tracing` record under the `analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn deliver(&self, event: &TelemetryEvent) -> AuthResult<()> {
        let params = serde_json::to_string(&event.params)
            .map_err(|e| format!("SYSTEM_ERROR: analytics params encode failed: {e}"))?;
        tracing::info!(target: "analytics", event = %event.name, params = %params, "analytics event");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn deliver(&self, _event: &TelemetryEvent) -> AuthResult<()> {
        Ok(())
    }
}

fn deliver_best_effort(sink: &dyn TelemetrySink, event: &TelemetryEvent) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::debug!(event = %event.name, error = %err, "analytics delivery failed; dropped");
        }
        Err(_) => {
            tracing::debug!(event = %event.name, "analytics sink panicked; dropped");
        }
    }
}

#[derive(Clone)]
enum Dispatch {
    Disabled,
    Direct(Arc<dyn TelemetrySink>),
    Queued(mpsc::Sender<TelemetryEvent>),
}

/// Cheap-to-clone handle used by auth flows to emit analytics.
#[derive(Clone)]
pub struct Telemetry {
    dispatch: Dispatch,
    dropped: Arc<AtomicU64>,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.dispatch {
            Dispatch::Disabled => "disabled",
            Dispatch::Direct(_) => "direct",
            Dispatch::Queued(_) => "queued",
        };
        f.debug_struct("Telemetry")
            .field("mode", &mode)
            .field("dropped", &self.dropped_events())
            .finish()
    }
}

impl Telemetry {
    fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn disabled() -> Self {
        Self::with_dispatch(Dispatch::Disabled)
    }

    /// Deliver inline on the caller's task.
    pub fn direct(sink: Arc<dyn TelemetrySink>) -> Self {
        Self::with_dispatch(Dispatch::Direct(sink))
    }

    /// Deliver from a background task fed by a bounded queue. Must be called inside a tokio runtime.
    pub fn spawn_queued(
        sink: Arc<dyn TelemetrySink>,
        capacity: usize,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(capacity.max(1));
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver_best_effort(sink.as_ref(), &event);
            }
            tracing::debug!("analytics queue closed");
        });
        (Self::with_dispatch(Dispatch::Queued(tx)), task)
    }

    /// Number of events dropped because the queue was full or closed.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn emit(&self, event: TelemetryEvent) {
        match &self.dispatch {
            Dispatch::Disabled => {}
            Dispatch::Direct(sink) => deliver_best_effort(sink.as_ref(), &event),
            Dispatch::Queued(tx) => {
                if let Err(err) = tx.try_send(event) {
                    let reason = match err {
                        mpsc::error::TrySendError::Full(_) => "full",
                        mpsc::error::TrySendError::Closed(_) => "closed",
                    };
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(reason, "analytics queue unavailable; event dropped");
                }
            }
        }
    }

    pub fn track(&self, event: AnalyticsEvent, params: Value) {
        self.emit(TelemetryEvent::new(event, params));
    }

    pub fn track_page_view(&self, page_name: &str) {
        self.track(
            AnalyticsEvent::PageView,
            serde_json::json!({ "page_name": page_name }),
        );
    }

    pub fn track_user_action(&self, action: &str, params: Value) {
        let mut base = Map::new();
        base.insert("action".to_string(), Value::from(action));
        self.emit(TelemetryEvent {
            name: AnalyticsEvent::ButtonClick.as_str().to_string(),
            params: merge_params(base, params),
        });
    }

    pub fn track_feature_use(&self, feature: &str, params: Value) {
        let mut base = Map::new();
        base.insert("feature".to_string(), Value::from(feature));
        self.emit(TelemetryEvent {
            name: AnalyticsEvent::FeatureUse.as_str().to_string(),
            params: merge_params(base, params),
        });
    }

    pub fn track_auth_success(&self, method: &str, params: Value) {
        let mut base = Map::new();
        base.insert("method".to_string(), Value::from(method));
        self.emit(TelemetryEvent {
            name: AnalyticsEvent::Login.as_str().to_string(),
            params: merge_params(base, params),
        });
    }

    pub fn track_auth_failure(&self, record: &ErrorRecord) {
        self.track(
            AnalyticsEvent::Error,
            serde_json::json!({
                "error_type": "auth_error",
                "error_code": record.code,
                "error_message": record.raw_message,
                "context": record.context,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySink;
    use std::time::Duration;

    struct PanickingSink;

    impl TelemetrySink for PanickingSink {
        fn deliver(&self, _event: &TelemetryEvent) -> AuthResult<()> {
            panic!("sink exploded");
        }
    }

    #[test]
    fn event_names_match_wire_names() {
        assert_eq!(AnalyticsEvent::Login.as_str(), "login");
        assert_eq!(AnalyticsEvent::ButtonClick.as_str(), "button_click");
        assert_eq!(AnalyticsEvent::Error.as_str(), "error");
    }

    #[test]
    fn user_action_merges_extra_params() {
        let sink = Arc::new(MemorySink::default());
        let telemetry = Telemetry::direct(sink.clone());

        telemetry.track_user_action("sign_out", serde_json::json!({ "source": "header" }));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "button_click");
        assert_eq!(events[0].param_str("action"), Some("sign_out"));
        assert_eq!(events[0].param_str("source"), Some("header"));
    }

    #[test]
    fn direct_delivery_swallows_sink_errors_and_panics() {
        let failing = Arc::new(MemorySink::failing());
        Telemetry::direct(failing.clone()).track_page_view("home");
        assert!(failing.events().is_empty());

        Telemetry::direct(Arc::new(PanickingSink)).track_page_view("home");
    }

    #[test]
    fn disabled_telemetry_drops_everything() {
        let telemetry = Telemetry::disabled();
        telemetry.track_auth_success("google", Value::Null);
        assert_eq!(telemetry.dropped_events(), 0);
    }

    #[tokio::test]
    async fn queued_delivery_reaches_sink() {
        let sink = Arc::new(MemorySink::default());
        let (telemetry, task) = Telemetry::spawn_queued(sink.clone(), 8);

        telemetry.track_auth_success("github", Value::Null);
        drop(telemetry);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("drain in time")
            .expect("drain task");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "login");
        assert_eq!(events[0].param_str("method"), Some("github"));
    }

    #[tokio::test]
    async fn closed_queue_counts_dropped_events() {
        let sink = Arc::new(MemorySink::default());
        let (telemetry, task) = Telemetry::spawn_queued(sink, 1);
        task.abort();
        let _ = task.await;

        telemetry.track_page_view("pricing");
        assert_eq!(telemetry.dropped_events(), 1);
    }
}
