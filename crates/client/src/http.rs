//! Configured HTTP access layer.
//!
//! [`ApiClient`] owns one `reqwest` connection pool pointed at the backend
//! base URL. Every call attaches the bearer token the instance was built
//! with, unwraps the backend's `{"data": ...}` envelope and turns non-2xx
//! statuses into [`ClientError::Status`] after running the status handler
//! registered in the [`FaultPolicy`].

use std::fmt;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use dwa_core::User;

use crate::api::Api;
use crate::config::ClientConfig;
use crate::envelope::{error_message, parse_body, unwrap_envelope};
use crate::error::{ClientError, Result};
use crate::fault::{FaultPolicy, HttpFailure};
use crate::storage::{SessionStorage, USER_KEY};

/// Longest slice of a non-JSON error body kept as the failure message.
const MAX_RAW_MESSAGE: usize = 200;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the DWA backend.
///
/// Cheap to clone; clones share the connection pool, the fault policy and
/// the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
    faults: FaultPolicy,
}

impl ApiClient {
    /// Create an unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, faults: FaultPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base: config.api_base.clone(),
                token: None,
                faults,
            }),
        })
    }

    /// Create a client carrying the token of the persisted user, if any.
    ///
    /// The token is read once; later changes to the stored user need a new
    /// instance (see [`with_token`](Self::with_token)).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built. Storage that
    /// cannot be read and a stored user that fails to parse are both ignored.
    pub fn from_storage(
        config: &ClientConfig,
        faults: FaultPolicy,
        storage: &dyn SessionStorage,
    ) -> Result<Self> {
        let client = Self::new(config, faults)?;
        let raw = storage.get(USER_KEY).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable session storage");
            None
        });
        let token = raw.and_then(|raw| match serde_json::from_str::<User>(&raw) {
            Ok(user) => user.bearer_token(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted user");
                None
            }
        });
        Ok(match token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    /// A client sharing this one's pool and policy, authenticated with `token`.
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        let token: String = token.into();
        let token = Some(token.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);
        self.derive(token)
    }

    /// A client sharing this one's pool and policy, without credentials.
    #[must_use]
    pub fn without_token(&self) -> Self {
        self.derive(None)
    }

    fn derive(&self, token: Option<SecretString>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: self.inner.client.clone(),
                base: self.inner.base.clone(),
                token,
                faults: self.inner.faults.clone(),
            }),
        }
    }

    /// Whether requests carry a bearer token.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner.token.is_some()
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// The fault policy consulted on failures.
    #[must_use]
    pub fn faults(&self) -> &FaultPolicy {
        &self.inner.faults
    }

    /// Typed backend endpoints.
    #[must_use]
    pub const fn api(&self) -> Api<'_> {
        Api::new(self)
    }

    /// Resolve `path` relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the joined URL does not parse.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.inner.base.join(path.trim_start_matches('/'))?)
    }

    // =========================================================================
    // Typed verbs
    // =========================================================================

    /// `GET path`, decoding the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or if the
    /// payload does not match `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.get_value(path).await?)
    }

    /// `POST path` with a JSON body, decoding the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or if the
    /// payload does not match `T`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.post_value(path, body).await?)
    }

    /// `PUT path` with a JSON body, decoding the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or if the
    /// payload does not match `T`.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        decode(self.put_value(path, body).await?)
    }

    /// `DELETE path`, decoding the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or if the
    /// payload does not match `T`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.delete_value(path).await?)
    }

    // =========================================================================
    // Raw verbs
    // =========================================================================

    /// `GET path`, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn get_value(&self, path: &str) -> Result<Value> {
        self.execute(Method::GET, path, None).await
    }

    /// `POST path`, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Encode` if `body` cannot be serialized, or an
    /// error on transport failure or non-2xx status.
    pub async fn post_value<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = serde_json::to_value(body).map_err(ClientError::Encode)?;
        self.execute(Method::POST, path, Some(body)).await
    }

    /// `PUT path`, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Encode` if `body` cannot be serialized, or an
    /// error on transport failure or non-2xx status.
    pub async fn put_value<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let body = serde_json::to_value(body).map_err(ClientError::Encode)?;
        self.execute(Method::PUT, path, Some(body)).await
    }

    /// `DELETE path`, returning the unwrapped payload.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn delete_value(&self, path: &str) -> Result<Value> {
        self.execute(Method::DELETE, path, None).await
    }

    /// Send one request and apply the envelope and failure rules.
    #[instrument(skip(self, body), fields(method = %method, path = %path))]
    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.url(path)?;

        let mut request = self.inner.client.request(method.clone(), url.clone());
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %method, url = %url, error = %e, "Request failed before a response");
                return Err(e.into());
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let failure = HttpFailure {
                status,
                method,
                url,
                message: failure_message(&bytes),
            };
            return Err(self.fail(failure));
        }

        let payload = parse_body(&bytes).map_err(|e| {
            warn!(
                status = %status,
                body = %String::from_utf8_lossy(&bytes).chars().take(MAX_RAW_MESSAGE).collect::<String>(),
                "Response body is not JSON"
            );
            ClientError::Decode(e)
        })?;

        debug!(status = %status, "Request succeeded");
        Ok(unwrap_envelope(payload))
    }

    /// Log a status failure, run its handler and build the error.
    fn fail(&self, failure: HttpFailure) -> ClientError {
        if failure.status.is_server_error() {
            tracing::error!(
                status = %failure.status,
                method = %failure.method,
                url = %failure.url,
                backend_message = failure.message.as_deref().unwrap_or_default(),
                "Backend returned server error"
            );
        } else {
            warn!(
                status = %failure.status,
                method = %failure.method,
                url = %failure.url,
                backend_message = failure.message.as_deref().unwrap_or_default(),
                "Backend rejected request"
            );
        }

        self.inner.faults.dispatch(&failure);

        ClientError::Status {
            status: failure.status,
            message: failure.message,
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.inner.base.as_str())
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .field("faults", &self.inner.faults)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Response payload has an unexpected shape");
        ClientError::Decode(e)
    })
}

/// The backend message carried by a failure body, JSON or not.
fn failure_message(bytes: &[u8]) -> Option<String> {
    match parse_body(bytes) {
        Ok(body) => error_message(&unwrap_envelope(body)),
        Err(_) => {
            let raw = String::from_utf8_lossy(bytes);
            let raw = raw.trim();
            (!raw.is_empty()).then(|| raw.chars().take(MAX_RAW_MESSAGE).collect())
        }
    }
}

/// Whether `err` is a status failure with `status`.
#[must_use]
pub fn is_status(err: &ClientError, status: StatusCode) -> bool {
    err.status() == Some(status)
}
