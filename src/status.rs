//! Status codes reported across the boundary.
//!
//! The numeric values follow the platform's common status codes so that a
//! status coming out of the sign-in SDK can be passed through verbatim. Codes
//! this crate does not know about survive as [`StatusCode::Other`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome of a sign-in operation.
///
/// All successful codes are less than or equal to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Successful, but the device's cache was used.
    SuccessCached,
    /// The operation was successful.
    Success,
    /// No user is signed in; the default for a result nobody has written yet.
    #[default]
    SignInRequired,
    /// An invalid account name was specified.
    InvalidAccount,
    /// Completing the operation requires some form of resolution.
    ResolutionRequired,
    /// A network error occurred.
    NetworkError,
    /// An internal error occurred while setting up the request.
    InternalError,
    /// The application is misconfigured, or a request was rejected as busy.
    DeveloperError,
    /// The operation failed with no more detailed information.
    Error,
    /// A blocking wait was interrupted.
    Interrupted,
    /// Timed out while awaiting the result.
    Timeout,
    /// The result was canceled.
    Canceled,
    /// A method was called on an API that failed to connect.
    ApiNotConnected,
    /// The native sentinel for a result that has not been populated.
    Uninitialized,
    /// The sign-in attempt did not succeed with the current account.
    SignInFailed,
    /// The user canceled the sign-in flow.
    SignInCancelled,
    /// A sign-in flow is already in progress.
    SignInCurrentlyInProgress,
    /// Any other code reported by the SDK.
    Other(i32),
}

impl StatusCode {
    /// The raw integer value.
    pub const fn code(self) -> i32 {
        match self {
            Self::SuccessCached => -1,
            Self::Success => 0,
            Self::SignInRequired => 4,
            Self::InvalidAccount => 5,
            Self::ResolutionRequired => 6,
            Self::NetworkError => 7,
            Self::InternalError => 8,
            Self::DeveloperError => 10,
            Self::Error => 13,
            Self::Interrupted => 14,
            Self::Timeout => 15,
            Self::Canceled => 16,
            Self::ApiNotConnected => 17,
            Self::Uninitialized => 100,
            Self::SignInFailed => 12500,
            Self::SignInCancelled => 12501,
            Self::SignInCurrentlyInProgress => 12502,
            Self::Other(code) => code,
        }
    }

    pub const fn is_success(self) -> bool {
        self.code() <= 0
    }

    pub const fn is_canceled(self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Short stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::SuccessCached => "success_cached",
            Self::Success => "success",
            Self::SignInRequired => "sign_in_required",
            Self::InvalidAccount => "invalid_account",
            Self::ResolutionRequired => "resolution_required",
            Self::NetworkError => "network_error",
            Self::InternalError => "internal_error",
            Self::DeveloperError => "developer_error",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
            Self::ApiNotConnected => "api_not_connected",
            Self::Uninitialized => "uninitialized",
            Self::SignInFailed => "sign_in_failed",
            Self::SignInCancelled => "sign_in_cancelled",
            Self::SignInCurrentlyInProgress => "sign_in_currently_in_progress",
            Self::Other(_) => "other",
        }
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        match code {
            -1 => Self::SuccessCached,
            0 => Self::Success,
            4 => Self::SignInRequired,
            5 => Self::InvalidAccount,
            6 => Self::ResolutionRequired,
            7 => Self::NetworkError,
            8 => Self::InternalError,
            10 => Self::DeveloperError,
            13 => Self::Error,
            14 => Self::Interrupted,
            15 => Self::Timeout,
            16 => Self::Canceled,
            17 => Self::ApiNotConnected,
            100 => Self::Uninitialized,
            12500 => Self::SignInFailed,
            12501 => Self::SignInCancelled,
            12502 => Self::SignInCurrentlyInProgress,
            other => Self::Other(other),
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::from)
    }
}
