//! Sign-in requests.
//!
//! A [`TokenRequest`] bundles the configuration for one sign-in attempt with
//! the [`PendingResult`] its outcome is written to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

use crate::account::SignInAccount;
use crate::error::BridgeError;
use crate::handle::RequestHandle;
use crate::pending::PendingResult;
use crate::status::StatusCode;

/// What a sign-in attempt should ask the SDK for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInConfiguration {
    /// Use the games sign-in base configuration instead of the default one.
    #[serde(default)]
    pub use_games_config: bool,
    /// Web client id of the backend server. Required for auth codes and id tokens.
    #[serde(default)]
    pub web_client_id: String,
    /// Request a server auth code.
    #[serde(default)]
    pub request_auth_code: bool,
    /// Force a new refresh token when exchanging the auth code. Causes re-consent.
    #[serde(default)]
    pub force_refresh_token: bool,
    #[serde(default)]
    pub request_email: bool,
    #[serde(default)]
    pub request_id_token: bool,
    /// Hide the games connecting popup and route other popups to an invisible view.
    #[serde(default)]
    pub hide_ui_popups: bool,
    /// Account to default to when signing in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default)]
    pub additional_scopes: Vec<String>,
}

impl SignInConfiguration {
    /// Check that every requested capability has what it needs.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.web_client_id.is_empty() {
            if self.request_auth_code {
                error!("Invalid configuration, auth code requires web client id");
                return Err(BridgeError::InvalidConfiguration(
                    "auth code requires a web client id".to_string(),
                ));
            }
            if self.request_id_token {
                error!("Invalid configuration, id token requires web client id");
                return Err(BridgeError::InvalidConfiguration(
                    "id token requires a web client id".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Process-unique request identity, distinct from the caller's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// One sign-in attempt.
pub struct TokenRequest {
    id: RequestId,
    handle: RequestHandle,
    configuration: SignInConfiguration,
    pending: Arc<PendingResult>,
}

impl TokenRequest {
    pub fn new(configuration: SignInConfiguration, handle: RequestHandle) -> Self {
        Self {
            id: RequestId::next(),
            handle,
            configuration,
            pending: Arc::new(PendingResult::new(handle)),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn handle(&self) -> RequestHandle {
        self.handle
    }

    pub fn configuration(&self) -> &SignInConfiguration {
        &self.configuration
    }

    /// The result this request completes.
    pub fn pending(&self) -> &Arc<PendingResult> {
        &self.pending
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.configuration.validate()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Record the outcome and complete the pending result in one step.
    pub fn complete(&self, status: StatusCode, account: Option<SignInAccount>) {
        self.pending.set_payload(account, status);
        self.pending.finalize(status);
    }

    pub fn cancel(&self) {
        self.pending.cancel();
    }
}

impl fmt::Display for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(a:{}:e:{}:i:{})",
            self.id,
            self.configuration.request_auth_code,
            self.configuration.request_email,
            self.configuration.request_id_token
        )
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}
