//! Routing results back to the future each handle was issued for.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::account::SignInAccount;
use crate::handle::RequestHandle;
use crate::helper::ResultListener;
use crate::pending::PendingResult;
use crate::status::StatusCode;

/// A [`ResultListener`] that completes the [`PendingResult`] registered
/// under each handle. A handle is delivered at most once; results for
/// unknown or already delivered handles are dropped.
#[derive(Debug, Default)]
pub struct CallbackRouter {
    routes: Mutex<HashMap<RequestHandle, Arc<PendingResult>>>,
}

impl CallbackRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh future for `handle` and return it.
    pub fn track(&self, handle: RequestHandle) -> Arc<PendingResult> {
        let pending = Arc::new(PendingResult::new(handle));
        if let Some(previous) = self.routes.lock().insert(handle, Arc::clone(&pending)) {
            warn!(%handle, "Replacing undelivered result route");
            previous.cancel();
        }
        pending
    }

    /// Stop routing `handle`. Returns the future if it was still waiting.
    pub fn forget(&self, handle: RequestHandle) -> Option<Arc<PendingResult>> {
        self.routes.lock().remove(&handle)
    }

    pub fn is_tracking(&self, handle: RequestHandle) -> bool {
        self.routes.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.lock().is_empty()
    }
}

impl ResultListener for CallbackRouter {
    fn on_result(&self, handle: RequestHandle, status: StatusCode, account: Option<SignInAccount>) {
        let Some(pending) = self.routes.lock().remove(&handle) else {
            warn!(%handle, %status, "No future waiting for result, dropping");
            return;
        };
        debug!(%handle, %status, has_account = account.is_some(), "Routing result");
        pending.set_payload(account, status);
        pending.finalize(status);
    }
}
