//! Command implementations and the session context they share.

pub mod account;
pub mod shop;
pub mod vendor;

use std::sync::Arc;

use thiserror::Error;

use dwa_client::checkout::CheckoutError;
use dwa_client::{
    ApiClient, CartService, ClientConfig, ClientError, ClientStore, ConfigError, FaultPolicy,
    FileStorage, Navigator, SessionGuard, SessionStatus, SessionStorage, verify_session,
};
use dwa_core::{NavigationMode, Route, User, ValidationError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request or local session operation failed.
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),

    /// Checkout did not complete.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The command needs a signed-in account.
    #[error("Not signed in. Run `dwa login` first")]
    NotSignedIn,

    /// The command is only for vendors.
    #[error("Only vendor accounts can manage listings")]
    NotVendor,

    /// A destructive command was run without confirmation.
    #[error("Refusing to {0} without --yes")]
    Unconfirmed(&'static str),
}

/// Prints redirects the way a browser front-end would follow them.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    #[allow(clippy::print_stderr)]
    fn navigate(&self, route: Route, mode: NavigationMode) {
        tracing::debug!(route = %route, ?mode, "Navigating");
        if route == Route::SignIn {
            eprintln!("Your session has ended. Sign in again with `dwa login`.");
        }
    }
}

/// Restored session plus everything a command needs to act on it.
pub struct Context {
    pub config: ClientConfig,
    pub store: ClientStore,
    pub client: ApiClient,
    pub status: SessionStatus,
    pub navigator: Arc<TerminalNavigator>,
    _session_guard: SessionGuard,
}

impl Context {
    /// Load configuration, restore the saved session, check it against the
    /// backend and mount the 401 handler.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if configuration is invalid or the session
    /// storage cannot be used.
    pub async fn load() -> Result<Self, CommandError> {
        let config = ClientConfig::from_env()?;
        let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(&config.session_dir));

        let store = ClientStore::restore(Arc::clone(&storage));
        let faults = FaultPolicy::new();
        let mut client = ApiClient::from_storage(&config, faults.clone(), storage.as_ref())?;

        let status = verify_session(&client, &store).await?;
        if status == SessionStatus::Reset {
            client = client.without_token();
        }

        let navigator = Arc::new(TerminalNavigator);
        let session_guard = SessionGuard::mount(&faults, navigator.clone(), store.clone());

        Ok(Self {
            config,
            store,
            client,
            status,
            navigator,
            _session_guard: session_guard,
        })
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::NotSignedIn` for the anonymous user.
    pub fn require_user(&self) -> Result<User, CommandError> {
        let user = self.store.user();
        if user.is_authenticated() {
            Ok(user)
        } else {
            Err(CommandError::NotSignedIn)
        }
    }

    pub fn cart_service(&self) -> CartService {
        CartService::new(self.client.clone(), self.store.clone())
    }
}
