//! Bridge between native code and a platform sign-in SDK.
//!
//! Native code submits a sign-in request under a caller-chosen handle and
//! gets exactly one result back for it, no matter how many times the hosting
//! UI container is paused, torn down or recreated in between.

pub mod account;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod correlation;
pub mod error;
pub mod handle;
pub mod helper;
pub mod logging;
pub mod pending;
pub mod platform;
pub mod request;
pub mod status;

pub use account::SignInAccount;
pub use client::SignInClient;
pub use coordinator::{CoordinatorRegistry, CoordinatorState, HostId, SignInCoordinator};
pub use correlation::CallbackRouter;
pub use error::BridgeError;
pub use handle::{HandleAllocator, RequestHandle};
pub use helper::{ResultListener, SignInHelper};
pub use pending::{PendingResult, TokenResult};
pub use request::{SignInConfiguration, TokenRequest};
pub use status::StatusCode;
