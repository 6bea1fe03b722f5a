//! Interfaces to the platform sign-in SDK.
//!
//! The bridge never talks to the SDK directly. A host supplies a
//! [`SessionClientFactory`] that turns [`SignInOptions`] into a live
//! [`SessionClient`], and the client reports connection changes back through
//! [`ConnectionEvents`]. Results of the interactive flow do not come back
//! through the client at all; the host forwards them to
//! [`SignInCoordinator::on_activity_result`](crate::coordinator::SignInCoordinator::on_activity_result).

pub mod capability;
pub mod options;
pub mod simulated;

use std::sync::Arc;

use crate::account::SignInAccount;
use crate::error::BridgeError;
use crate::status::StatusCode;

pub use capability::{CapabilityProvider, CapabilityRegistry, GAMES_CAPABILITY};
pub use options::{BaseOptions, OptionsExtension, ServerAuthCode, SignInOptions, SignInOptionsBuilder};

/// Request code the interactive flow is launched with.
pub const SIGN_IN_REQUEST_CODE: i32 = 9009;

/// How strictly the client should require a signed-in user when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Required,
    Optional,
}

/// What the SDK reported for a silent or interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub status: StatusCode,
    pub account: Option<SignInAccount>,
}

impl SignInOutcome {
    pub fn success(account: SignInAccount) -> Self {
        Self {
            status: StatusCode::Success,
            account: Some(account),
        }
    }

    pub fn failure(status: StatusCode) -> Self {
        Self {
            status,
            account: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Callback for a silent sign-in, invoked once from any thread.
pub type OutcomeCallback = Box<dyn FnOnce(SignInOutcome) + Send + 'static>;

/// Failure raised by the SDK or by a capability provider.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<PlatformError> for BridgeError {
    fn from(err: PlatformError) -> Self {
        BridgeError::ClientSetup(err.0)
    }
}

/// A connection to the account session service.
pub trait SessionClient: Send + Sync {
    fn connect(&self, mode: ConnectMode);

    fn disconnect(&self);

    /// Whether the sign-in capability is connected, i.e. a user is already
    /// authenticated with this client's options.
    fn has_connected_capability(&self) -> bool;

    /// Re-authenticate without UI. `done` runs exactly once.
    fn silent_sign_in(&self, done: OutcomeCallback);

    /// Start the interactive flow. Its result arrives through the host's
    /// UI-result channel tagged with `request_code`.
    fn launch_sign_in_ui(&self, request_code: i32) -> Result<(), PlatformError>;

    fn sign_out(&self);
}

/// Connection callbacks a session client reports to its owner.
pub trait ConnectionEvents: Send + Sync {
    fn on_connected(&self);

    fn on_connection_suspended(&self, cause: i32);

    fn on_connection_failed(&self, status: StatusCode, has_resolution: bool);
}

/// Builds session clients from sign-in options.
pub trait SessionClientFactory: Send + Sync {
    fn build(
        &self,
        options: SignInOptions,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Arc<dyn SessionClient>, PlatformError>;
}
