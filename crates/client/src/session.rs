//! Session lifecycle: sign-in, sign-out and the 401 bridge.
//!
//! [`SessionGuard`] ties the fault policy to the store: while a guard is
//! mounted, any request rejected with 401 logs the user out and sends the
//! front-end to the sign-in route.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{info, instrument, warn};

use dwa_core::validation::{LoginForm, SignupForm};
use dwa_core::{Email, NavigationMode, Route, User, ValidationError};

use crate::api::{ProfileUpdate, SignupOutcome};
use crate::error::{ClientError, Result};
use crate::fault::FaultPolicy;
use crate::http::ApiClient;
use crate::store::ClientStore;

/// Moves the front-end between routes.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route, mode: NavigationMode);
}

/// Reset the store and drop the persisted session.
///
/// # Errors
///
/// Returns `ClientError::Storage` if the persisted session cannot be
/// removed; the in-memory store is reset regardless.
pub fn logout(store: &ClientStore) -> Result<()> {
    let reset = store.reset(None);
    store.clear_persisted()?;
    reset
}

// =============================================================================
// SessionGuard
// =============================================================================

/// Keeps the 401 handler registered while alive.
#[derive(Debug)]
#[must_use = "dropping the guard unregisters the 401 handler"]
pub struct SessionGuard {
    faults: FaultPolicy,
}

impl SessionGuard {
    /// Register the 401 handler unless one is already present.
    pub fn mount(faults: &FaultPolicy, navigator: Arc<dyn Navigator>, store: ClientStore) -> Self {
        let registered = faults.register_if_absent(StatusCode::UNAUTHORIZED, move |failure| {
            warn!(url = %failure.url, "Session rejected, signing out");
            if let Err(e) = logout(&store) {
                warn!(error = %e, "Failed to clear persisted session");
            }
            navigator.navigate(Route::SignIn, NavigationMode::Replace);
        });
        tracing::debug!(registered, "Session guard mounted");

        Self {
            faults: faults.clone(),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.faults.clear(StatusCode::UNAUTHORIZED);
    }
}

// =============================================================================
// Sign-in / sign-up / sign-out
// =============================================================================

/// An established session.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    /// Client carrying the new session's token.
    pub client: ApiClient,
    /// Where the user lands for their role.
    pub dashboard: Route,
}

/// Result of [`sign_up`].
#[derive(Debug, Clone)]
pub enum SignUp {
    /// The backend issued a session right away.
    SignedIn(SignedIn),
    /// The account exists; the user still has to sign in.
    Created { message: String },
}

/// Validate the form, log in and store the returned user.
///
/// # Errors
///
/// Returns `ClientError::Validation` before any request if the form is
/// invalid, or the login failure. A login answer without a session is
/// `ClientError::NotAuthenticated`.
#[instrument(skip(client, store, form), fields(email = %form.email))]
pub async fn sign_in(client: &ApiClient, store: &ClientStore, form: &LoginForm) -> Result<SignedIn> {
    form.validate()?;
    let user = client.api().login(form).await?;
    establish(client, store, user)
}

/// Validate the form and create the account.
///
/// # Errors
///
/// Returns `ClientError::Validation` before any request if the form is
/// invalid, or the signup failure.
#[instrument(skip(client, store, form), fields(email = %form.email, vendor = form.is_vendor))]
pub async fn sign_up(
    client: &ApiClient,
    store: &ClientStore,
    form: &SignupForm,
    required_domain: Option<&str>,
) -> Result<SignUp> {
    form.validate(required_domain)?;
    match client.api().signup(form).await? {
        SignupOutcome::SignedIn(user) => Ok(SignUp::SignedIn(establish(client, store, user)?)),
        SignupOutcome::Created(message) => {
            info!("Account created");
            Ok(SignUp::Created { message })
        }
    }
}

fn establish(client: &ApiClient, store: &ClientStore, user: User) -> Result<SignedIn> {
    let Some(token) = user.bearer_token().filter(|_| user.is_authenticated()) else {
        warn!("Backend answered without a session");
        return Err(ClientError::NotAuthenticated);
    };
    store.set_user(user.clone())?;
    info!(uid = %user.uid, role = %user.user_type, "Signed in");
    Ok(SignedIn {
        dashboard: user.user_type.dashboard(),
        client: client.with_token(token),
        user,
    })
}

/// Log out locally and go to the sign-in route. Returns a client without
/// credentials.
///
/// # Errors
///
/// Returns `ClientError::Storage` if the persisted session cannot be removed.
pub fn sign_out(client: &ApiClient, store: &ClientStore, navigator: &dyn Navigator) -> Result<ApiClient> {
    logout(store)?;
    navigator.navigate(Route::SignIn, NavigationMode::Replace);
    info!("Signed out");
    Ok(client.without_token())
}

/// Delete the signed-in account, then sign out.
///
/// # Errors
///
/// Returns `ClientError::NotAuthenticated` without a session, or the
/// request failure (the session is kept in that case).
#[instrument(skip_all)]
pub async fn delete_account(
    client: &ApiClient,
    store: &ClientStore,
    navigator: &dyn Navigator,
) -> Result<ApiClient> {
    let user = store.user();
    if !user.is_authenticated() {
        return Err(ClientError::NotAuthenticated);
    }
    client.api().delete_user(&user.uid).await?;
    sign_out(client, store, navigator)
}

/// Change the signed-in user's email and display name.
///
/// # Errors
///
/// Returns `ClientError::NotAuthenticated` without a session,
/// `ClientError::Validation` for a blank name or malformed email, or the
/// request failure.
#[instrument(skip_all)]
pub async fn update_profile(
    client: &ApiClient,
    store: &ClientStore,
    email: &str,
    name: &str,
) -> Result<String> {
    let user = store.user();
    if !user.is_authenticated() {
        return Err(ClientError::NotAuthenticated);
    }
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name").into());
    }
    let email = Email::parse(email).map_err(ValidationError::from)?;

    let update = ProfileUpdate::new(&user, email.as_str(), name.trim());
    let message = client.api().update_user(&update).await?;
    store.update_email(email.into_inner())?;
    store.update_name(name.trim())?;
    Ok(message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use dwa_core::{UserId, UserType};
    use reqwest::Method;
    use url::Url;

    use crate::fault::HttpFailure;
    use crate::storage::{MemoryStorage, SessionStorage, USER_KEY};

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Route, NavigationMode)>>);

    impl Navigator for Recorder {
        fn navigate(&self, route: Route, mode: NavigationMode) {
            self.0.lock().unwrap().push((route, mode));
        }
    }

    fn unauthorized() -> HttpFailure {
        HttpFailure {
            status: StatusCode::UNAUTHORIZED,
            method: Method::GET,
            url: Url::parse("http://localhost/auth/ping").unwrap(),
            message: None,
        }
    }

    fn signed_in_store() -> (Arc<MemoryStorage>, ClientStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ClientStore::new(storage.clone());
        store
            .set_user(User {
                uid: UserId::new("u-1"),
                name: "Ama".to_string(),
                email: "ama@b.io".to_string(),
                token: "tok".to_string(),
                user_type: UserType::Buyer,
            })
            .unwrap();
        (storage, store)
    }

    #[test]
    fn test_unauthorized_logs_out_and_redirects() {
        let faults = FaultPolicy::new();
        let (storage, store) = signed_in_store();
        let navigator = Arc::new(Recorder::default());
        let _guard = SessionGuard::mount(&faults, navigator.clone(), store.clone());

        assert!(faults.dispatch(&unauthorized()));

        assert!(!store.user().is_authenticated());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert_eq!(
            *navigator.0.lock().unwrap(),
            vec![(Route::SignIn, NavigationMode::Replace)]
        );
    }

    #[test]
    fn test_mount_keeps_existing_handler() {
        let faults = FaultPolicy::new();
        let (_, store) = signed_in_store();
        faults.register(StatusCode::UNAUTHORIZED, |_| {});
        let navigator = Arc::new(Recorder::default());
        let _guard = SessionGuard::mount(&faults, navigator.clone(), store.clone());

        faults.dispatch(&unauthorized());
        assert!(store.user().is_authenticated());
        assert!(navigator.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let faults = FaultPolicy::new();
        let (_, store) = signed_in_store();
        let guard = SessionGuard::mount(&faults, Arc::new(Recorder::default()), store);
        assert!(faults.has_handler(StatusCode::UNAUTHORIZED));
        drop(guard);
        assert!(!faults.has_handler(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_logout_resets_everything() {
        let (storage, store) = signed_in_store();
        logout(&store).unwrap();
        assert_eq!(store.user(), User::anonymous());
        assert!(store.cart().is_empty());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_invalid_form_before_request() {
        let config = crate::config::ClientConfig::new("http://127.0.0.1:9").unwrap();
        let client = ApiClient::new(&config, FaultPolicy::new()).unwrap();
        let store = ClientStore::new(Arc::new(MemoryStorage::new()));
        let err = sign_in(&client, &store, &LoginForm::new("", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::EmptyField("email"))));
    }
}
