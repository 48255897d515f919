//! Application-startup session check.

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::http::ApiClient;
use crate::session::logout;
use crate::store::ClientStore;

/// Outcome of [`verify_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The restored session's token was accepted.
    Valid,
    /// No session was restored and the backend is reachable.
    Anonymous,
    /// The check failed; the store was reset and the persisted session removed.
    Reset,
}

/// Check a restored session against the backend.
///
/// Calls `GET auth/ping` when the restored user carries a token, otherwise
/// `GET health`. A failed call or an empty `msg` resets the store to its
/// defaults and removes the persisted session.
///
/// `client` should carry the restored user's token (see
/// [`ApiClient::from_storage`]).
///
/// # Errors
///
/// Returns `ClientError::Storage` only if resetting the persisted session
/// fails. Backend failures are reported as [`SessionStatus::Reset`].
#[instrument(skip_all)]
pub async fn verify_session(client: &ApiClient, store: &ClientStore) -> Result<SessionStatus> {
    let authenticated = store.user().is_authenticated();
    let api = client.api();
    let outcome = if authenticated {
        api.ping().await
    } else {
        api.health().await
    };

    match outcome {
        Ok(msg) if !msg.trim().is_empty() => {
            info!(authenticated, "Session check passed");
            Ok(if authenticated {
                SessionStatus::Valid
            } else {
                SessionStatus::Anonymous
            })
        }
        Ok(_) => {
            warn!("Session check returned an empty message, resetting");
            logout(store)?;
            Ok(SessionStatus::Reset)
        }
        Err(e) => {
            warn!(error = %e, "Session check failed, resetting");
            logout(store)?;
            Ok(SessionStatus::Reset)
        }
    }
}
