use crate::handle::RequestHandle;
use crate::status::StatusCode;

/// Errors raised inside the bridge.
///
/// None of these cross the boundary as Rust errors; each one is reported to
/// the calling layer as the status code returned by [`BridgeError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The request asks for something its configuration cannot provide.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A capability was requested but no provider for it was registered.
    #[error("No provider registered for capability: {0}")]
    MissingCapability(String),

    /// A request is already held and was not superseded.
    #[error("Duplicate request: {existing} already pending, rejected {rejected}")]
    DuplicateRequest {
        existing: RequestHandle,
        rejected: RequestHandle,
    },

    /// Sign-in was started before anything was configured.
    #[error("Request not configured")]
    NotConfigured,

    /// A sign-in flow for another request is already running.
    #[error("Sign-in already in progress for {in_flight}")]
    Busy { in_flight: RequestHandle },

    /// The SDK failed while the session client was being built.
    #[error("Client setup failed: {0}")]
    ClientSetup(String),
}

impl BridgeError {
    /// Status reported over the boundary for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidConfiguration(_)
            | Self::MissingCapability(_)
            | Self::DuplicateRequest { .. }
            | Self::NotConfigured
            | Self::Busy { .. } => StatusCode::DeveloperError,
            Self::ClientSetup(_) => StatusCode::InternalError,
        }
    }
}
