//! Usage: Session-change listener registry with scoped unsubscribe handles.

use crate::domain::identity::UserIdentity;
use crate::shared::mutex_ext::MutexExt;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

pub type SessionListener = Arc<dyn Fn(Option<UserIdentity>) + Send + Sync>;

/// Unsubscribe handle returned by `IdentityBackend::on_session_changed`.
///
/// The release callback runs exactly once: on `unsubscribe()` or on drop, whichever comes first.
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn noop() -> Self {
        Self { release: None }
    }

    pub fn unsubscribe(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    listeners: BTreeMap<u64, SessionListener>,
}

/// Shared by backends to fan session changes out to subscribers.
#[derive(Clone, Default)]
pub struct SessionObservers {
    inner: Arc<Mutex<ListenerSet>>,
}

impl SessionObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` and deliver `current` to it before returning.
    pub fn subscribe(&self, listener: SessionListener, current: Option<UserIdentity>) -> Subscription {
        let id = self.inner.with_locked(|set| {
            let id = set.next_id;
            set.next_id = set.next_id.wrapping_add(1);
            set.listeners.insert(id, Arc::clone(&listener));
            id
        });
        listener(current);

        let weak: Weak<Mutex<ListenerSet>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.with_locked(|set| set.listeners.remove(&id));
            }
        })
    }

    /// Deliver `user` to every current listener. Listeners run outside the registry lock.
    pub fn notify(&self, user: Option<UserIdentity>) {
        let listeners: Vec<SessionListener> = self
            .inner
            .lock_or_recover()
            .listeners
            .values()
            .cloned()
            .collect();
        tracing::debug!(
            listeners = listeners.len(),
            signed_in = user.is_some(),
            "session changed"
        );
        for listener in listeners {
            listener(user.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.with_locked(|set| set.listeners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(id: &str) -> UserIdentity {
        UserIdentity {
            id: id.to_string(),
            email: None,
            display_name: None,
            email_verified: false,
            provider_id: "password".to_string(),
        }
    }

    fn recording_listener() -> (SessionListener, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let listener: SessionListener = Arc::new(move |user: Option<UserIdentity>| {
            seen_clone.lock().unwrap().push(user.map(|u| u.id));
        });
        (listener, seen)
    }

    #[test]
    fn subscribe_delivers_current_session_first() {
        let observers = SessionObservers::new();
        let (listener, seen) = recording_listener();

        let _sub = observers.subscribe(listener, Some(user("uid-1")));
        observers.notify(None);

        assert_eq!(*seen.lock().unwrap(), vec![Some("uid-1".to_string()), None]);
    }

    #[test]
    fn unsubscribe_detaches_listener() {
        let observers = SessionObservers::new();
        let (listener, seen) = recording_listener();

        let sub = observers.subscribe(listener, None);
        assert_eq!(observers.listener_count(), 1);
        sub.unsubscribe();
        assert_eq!(observers.listener_count(), 0);

        observers.notify(Some(user("uid-2")));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn release_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let sub = Subscription::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls_clone = Arc::clone(&calls);
        drop(Subscription::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let observers = SessionObservers::new();
        let (listener, _seen) = recording_listener();
        let sub = observers.subscribe(listener, None);
        drop(observers);
        sub.unsubscribe();
    }
}
