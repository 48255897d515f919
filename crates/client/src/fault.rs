//! Status-keyed failure handlers.
//!
//! A [`FaultPolicy`] maps an HTTP status code to a side-effecting handler
//! that the [`ApiClient`](crate::http::ApiClient) invokes whenever a request
//! fails with that status. Handlers observe failures; they never recover
//! from them, and the failing call still returns an error to its caller.
//!
//! The policy is injected at client construction. Clones share one registry,
//! so every client built from the same policy sees the same handlers, while
//! independent policies (e.g. one per test) share nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, StatusCode};
use url::Url;

/// What a handler is told about a failed request.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub method: Method,
    pub url: Url,
    /// Backend error message, if the body carried one.
    pub message: Option<String>,
}

/// A status handler.
pub type FaultHandler = Arc<dyn Fn(&HttpFailure) + Send + Sync>;

/// Shared registry of status handlers.
#[derive(Clone, Default)]
pub struct FaultPolicy {
    handlers: Arc<RwLock<HashMap<u16, FaultHandler>>>,
}

impl FaultPolicy {
    /// An empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `status`, replacing any existing handler.
    pub fn register<F>(&self, status: StatusCode, handler: F)
    where
        F: Fn(&HttpFailure) + Send + Sync + 'static,
    {
        self.write().insert(status.as_u16(), Arc::new(handler));
    }

    /// Register `handler` only if `status` has none yet. Returns whether it
    /// was registered. The check and insert happen under one lock.
    pub fn register_if_absent<F>(&self, status: StatusCode, handler: F) -> bool
    where
        F: Fn(&HttpFailure) + Send + Sync + 'static,
    {
        let mut handlers = self.write();
        if handlers.contains_key(&status.as_u16()) {
            return false;
        }
        handlers.insert(status.as_u16(), Arc::new(handler));
        true
    }

    /// Remove the handler for `status`.
    pub fn clear(&self, status: StatusCode) {
        self.write().remove(&status.as_u16());
    }

    /// Remove every handler.
    pub fn clear_all(&self) {
        self.write().clear();
    }

    #[must_use]
    pub fn has_handler(&self, status: StatusCode) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&status.as_u16())
    }

    /// Invoke the handler registered for `failure.status`, if any.
    ///
    /// The handler runs after the registry lock is released, so it may
    /// register or clear handlers itself.
    pub fn dispatch(&self, failure: &HttpFailure) -> bool {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&failure.status.as_u16())
            .cloned();

        match handler {
            Some(handler) => {
                tracing::debug!(status = %failure.status, url = %failure.url, "Dispatching fault handler");
                handler(failure);
                true
            }
            None => false,
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<u16, FaultHandler>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<u16> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        statuses.sort_unstable();
        f.debug_struct("FaultPolicy")
            .field("statuses", &statuses)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn failure(status: StatusCode) -> HttpFailure {
        HttpFailure {
            status,
            method: Method::GET,
            url: Url::parse("http://localhost/auth/ping").unwrap(),
            message: None,
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&HttpFailure) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move |_: &HttpFailure| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_register_replaces_not_stacks() {
        let policy = FaultPolicy::new();
        let (first, first_handler) = counter();
        let (second, second_handler) = counter();

        policy.register(StatusCode::UNAUTHORIZED, first_handler);
        policy.register(StatusCode::UNAUTHORIZED, second_handler);
        assert!(policy.dispatch(&failure(StatusCode::UNAUTHORIZED)));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_has_handler_after_clear() {
        let policy = FaultPolicy::new();
        policy.register(StatusCode::UNAUTHORIZED, |_| {});
        assert!(policy.has_handler(StatusCode::UNAUTHORIZED));
        policy.clear(StatusCode::UNAUTHORIZED);
        assert!(!policy.has_handler(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_clear_all() {
        let policy = FaultPolicy::new();
        policy.register(StatusCode::UNAUTHORIZED, |_| {});
        policy.register(StatusCode::FORBIDDEN, |_| {});
        policy.register(StatusCode::INTERNAL_SERVER_ERROR, |_| {});
        policy.clear_all();
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!policy.has_handler(status));
        }
    }

    #[test]
    fn test_dispatch_without_handler() {
        let policy = FaultPolicy::new();
        assert!(!policy.dispatch(&failure(StatusCode::NOT_FOUND)));
    }

    #[test]
    fn test_register_if_absent_is_idempotent() {
        let policy = FaultPolicy::new();
        let (first, first_handler) = counter();
        let (second, second_handler) = counter();
        assert!(policy.register_if_absent(StatusCode::UNAUTHORIZED, first_handler));
        assert!(!policy.register_if_absent(StatusCode::UNAUTHORIZED, second_handler));
        policy.dispatch(&failure(StatusCode::UNAUTHORIZED));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_registry_but_instances_do_not() {
        let policy = FaultPolicy::new();
        let clone = policy.clone();
        clone.register(StatusCode::UNAUTHORIZED, |_| {});
        assert!(policy.has_handler(StatusCode::UNAUTHORIZED));
        assert!(!FaultPolicy::new().has_handler(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_handler_may_clear_itself() {
        let policy = FaultPolicy::new();
        let inner = policy.clone();
        policy.register(StatusCode::UNAUTHORIZED, move |_| {
            inner.clear(StatusCode::UNAUTHORIZED);
        });
        assert!(policy.dispatch(&failure(StatusCode::UNAUTHORIZED)));
        assert!(!policy.has_handler(StatusCode::UNAUTHORIZED));
    }
}
