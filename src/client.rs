//! Calling-layer client.
//!
//! [`SignInClient`] is the API native code programs against: configure once,
//! then ask for futures. It mints a handle per attempt and wires a
//! [`CallbackRouter`] in as the boundary listener, so every result lands in
//! the future returned for it.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::coordinator::{CoordinatorRegistry, FlowMode, HostId, SignInCoordinator};
use crate::correlation::CallbackRouter;
use crate::handle::HandleAllocator;
use crate::helper::SignInHelper;
use crate::pending::PendingResult;
use crate::platform::{CapabilityRegistry, SessionClientFactory};
use crate::request::SignInConfiguration;

#[derive(Default)]
struct ClientState {
    configuration: Option<SignInConfiguration>,
    last: Option<Arc<PendingResult>>,
}

pub struct SignInClient {
    host: HostId,
    helper: SignInHelper,
    router: Arc<CallbackRouter>,
    handles: HandleAllocator,
    state: Mutex<ClientState>,
}

impl SignInClient {
    pub fn new(
        host: HostId,
        factory: Arc<dyn SessionClientFactory>,
        capabilities: Arc<CapabilityRegistry>,
        request_code: i32,
    ) -> Self {
        let router = Arc::new(CallbackRouter::new());
        let registry = CoordinatorRegistry::new(factory, router.clone())
            .with_capabilities(capabilities)
            .with_request_code(request_code);
        Self {
            host,
            helper: SignInHelper::new(Arc::new(registry)),
            router,
            handles: HandleAllocator::new(),
            state: Mutex::new(ClientState::default()),
        }
    }

    pub fn host(&self) -> &HostId {
        &self.host
    }

    pub fn helper(&self) -> &SignInHelper {
        &self.helper
    }

    /// Coordinator serving this client's host.
    pub fn coordinator(&self) -> Arc<SignInCoordinator> {
        self.helper.coordinator(&self.host)
    }

    /// Set the configuration used by subsequent sign-ins. The last result is
    /// forgotten.
    pub fn configure(&self, configuration: SignInConfiguration) {
        let mut state = self.state.lock();
        state.configuration = Some(configuration);
        if let Some(last) = state.last.take() {
            debug!(handle = %last.handle(), "Discarding last result after reconfigure");
        }
    }

    /// Start an interactive sign-in.
    pub fn sign_in(&self) -> Arc<PendingResult> {
        self.begin(FlowMode::Interactive)
    }

    /// Start a sign-in that never shows UI.
    pub fn sign_in_silently(&self) -> Arc<PendingResult> {
        self.begin(FlowMode::Silent)
    }

    /// Future of the most recent sign-in, if any since the last configure.
    pub fn last_result(&self) -> Option<Arc<PendingResult>> {
        self.state.lock().last.clone()
    }

    pub fn sign_out(&self) {
        self.helper.sign_out(&self.host);
    }

    pub fn disconnect(&self) {
        self.helper.disconnect(&self.host);
    }

    pub fn enable_debug_logging(&self, enabled: bool) {
        self.helper.enable_debug_logging(enabled);
    }

    fn begin(&self, mode: FlowMode) -> Arc<PendingResult> {
        let handle = self.handles.allocate();
        let pending = self.router.track(handle);
        let configuration = {
            let mut state = self.state.lock();
            state.last = Some(Arc::clone(&pending));
            state.configuration.clone()
        };
        debug!(host = %self.host, %handle, %mode, configured = configuration.is_some(), "Starting sign-in");

        // Rejections are reported through the router, which completes `pending`.
        if let Some(configuration) = configuration {
            if self.helper.configure(&self.host, configuration, handle).is_err() {
                return pending;
            }
        }
        let started = match mode {
            FlowMode::Interactive => self.helper.sign_in(&self.host, handle),
            FlowMode::Silent => self.helper.sign_in_silently(&self.host, handle),
        };
        match started {
            Ok(outcome) => debug!(host = %self.host, %handle, ?outcome, "Sign-in started"),
            Err(err) => debug!(host = %self.host, %handle, %err, "Sign-in rejected"),
        }
        pending
    }
}

impl std::fmt::Debug for SignInClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInClient")
            .field("host", &self.host)
            .field("routes", &self.router.len())
            .finish_non_exhaustive()
    }
}
