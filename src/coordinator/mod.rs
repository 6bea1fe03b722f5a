//! The request coordinator.
//!
//! A [`SignInCoordinator`] holds at most one [`TokenRequest`] and drives it
//! through the session client. Three independent triggers can finish a
//! request: the silent sign-in callback, the host's UI-result channel and a
//! connection failure. All of them funnel into [`SignInCoordinator::complete_current`],
//! which lets the first one through and drops the rest.
//!
//! The coordinator lock is never held while calling the session client,
//! completing a request or notifying the listener.

mod registry;
mod state;

pub use registry::{CoordinatorRegistry, HostId};
pub use state::{CoordinatorState, FlowMode, StartOutcome};

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, instrument, warn};

use crate::account::SignInAccount;
use crate::error::BridgeError;
use crate::handle::RequestHandle;
use crate::helper::ResultListener;
use crate::platform::{
    CapabilityRegistry, ConnectMode, ConnectionEvents, SessionClient, SessionClientFactory, SignInOptionsBuilder,
    SignInOutcome,
};
use crate::request::{RequestId, TokenRequest};
use crate::status::StatusCode;

/// Which SDK flow a request was handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatched {
    SilentReauth,
    Interface,
}

/// What woke up flow dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Processing,
    Connected,
}

struct Held {
    request: Arc<TokenRequest>,
    /// Set once processing begins.
    mode: Option<FlowMode>,
    dispatched: Option<Dispatched>,
    /// A completion trigger already fired.
    completing: bool,
}

impl Held {
    fn new(request: Arc<TokenRequest>) -> Self {
        Self {
            request,
            mode: None,
            dispatched: None,
            completing: false,
        }
    }

    fn is_live(&self, id: RequestId) -> bool {
        self.request.id() == id && !self.completing
    }
}

struct Inner {
    state: CoordinatorState,
    host_active: bool,
    held: Option<Held>,
    client: Option<Arc<dyn SessionClient>>,
}

impl Inner {
    fn live(&mut self, id: RequestId) -> Option<&mut Held> {
        self.held.as_mut().filter(|held| held.is_live(id))
    }

    /// Move the held request into processing.
    fn begin(&mut self, mode: FlowMode) -> Option<Arc<TokenRequest>> {
        let held = self.held.as_mut()?;
        held.mode = Some(mode);
        held.dispatched = None;
        self.state = CoordinatorState::Busy;
        Some(Arc::clone(&held.request))
    }

    fn idle_state(&self) -> CoordinatorState {
        if self.host_active {
            CoordinatorState::Ready
        } else {
            CoordinatorState::New
        }
    }
}

/// Drives one sign-in request at a time for one host.
pub struct SignInCoordinator {
    host: HostId,
    me: Weak<SignInCoordinator>,
    inner: Mutex<Inner>,
    factory: Arc<dyn SessionClientFactory>,
    capabilities: Arc<CapabilityRegistry>,
    listener: Arc<dyn ResultListener>,
    request_code: i32,
}

impl SignInCoordinator {
    pub fn new(
        host: HostId,
        factory: Arc<dyn SessionClientFactory>,
        capabilities: Arc<CapabilityRegistry>,
        listener: Arc<dyn ResultListener>,
        request_code: i32,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            host,
            me: me.clone(),
            inner: Mutex::new(Inner {
                state: CoordinatorState::New,
                host_active: false,
                held: None,
                client: None,
            }),
            factory,
            capabilities,
            listener,
            request_code,
        })
    }

    pub fn host(&self) -> &HostId {
        &self.host
    }

    pub fn state(&self) -> CoordinatorState {
        self.inner.lock().state
    }

    pub fn has_request(&self) -> bool {
        self.inner.lock().held.is_some()
    }

    /// Handle of the held request, if any.
    pub fn current_handle(&self) -> Option<RequestHandle> {
        self.inner.lock().held.as_ref().map(|held| held.request.handle())
    }

    pub fn is_host_active(&self) -> bool {
        self.inner.lock().host_active
    }

    pub fn request_code(&self) -> i32 {
        self.request_code
    }

    // -----------------------------------------------------------------------
    // Admission and start
    // -----------------------------------------------------------------------

    /// Admit a request.
    ///
    /// Accepted when nothing is held, or when the coordinator is idle with a
    /// request that was never started; that request is superseded and
    /// canceled. Anything else is rejected and the held request is untouched.
    #[instrument(skip(self, request), fields(host = %self.host, handle = %request.handle()))]
    pub fn submit(&self, request: TokenRequest) -> Result<(), BridgeError> {
        request.validate()?;

        let request = Arc::new(request);
        let superseded = {
            let mut inner = self.inner.lock();
            if let Some(held) = &inner.held {
                if inner.state != CoordinatorState::Ready {
                    error!(
                        existing = %held.request,
                        rejected = %request,
                        state = %inner.state,
                        "Existing request, ignoring new one"
                    );
                    return Err(BridgeError::DuplicateRequest {
                        existing: held.request.handle(),
                        rejected: request.handle(),
                    });
                }
            }
            inner.held.replace(Held::new(Arc::clone(&request)))
        };

        self.relay(&request);
        if let Some(previous) = superseded {
            warn!(previous = %previous.request, "Superseding unstarted request");
            previous.request.cancel();
        }
        debug!(request = %request, "Request submitted");
        Ok(())
    }

    /// Forward the request's single completion to the listener, releasing
    /// the slot first so the listener may submit again right away.
    fn relay(&self, request: &TokenRequest) {
        let id = request.id();
        let listener = Arc::clone(&self.listener);
        let me = self.me.clone();
        request.pending().register(move |result| {
            if let Some(coordinator) = me.upgrade() {
                coordinator.clear_request(Some(id), false);
            }
            debug!(handle = %result.handle, status = %result.status, "Relaying result");
            listener.on_result(result.handle, result.status, result.account);
        });
    }

    /// Start the held request in `mode`.
    ///
    /// Runs right away when the coordinator is idle and its host is active;
    /// otherwise parks in a pending state until [`on_host_active`](Self::on_host_active).
    #[instrument(skip(self), fields(host = %self.host))]
    pub fn start(&self, mode: FlowMode, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        let request = {
            let mut inner = self.inner.lock();
            let Some(held) = inner.held.as_ref() else {
                error!("Request not configured, failing sign-in");
                return Err(BridgeError::NotConfigured);
            };
            let held_handle = held.request.handle();

            match inner.state {
                CoordinatorState::Busy if held_handle == handle => {
                    warn!("There is already a pending callback configured");
                    return Ok(StartOutcome::AlreadyRunning);
                }
                CoordinatorState::Busy => {
                    error!(in_flight = %held_handle, "Sign-in already in progress for another request");
                    return Err(BridgeError::Busy { in_flight: held_handle });
                }
                CoordinatorState::Ready if inner.host_active => {
                    if held_handle != handle {
                        debug!(configured = %held_handle, "Starting request configured under another handle");
                    }
                    inner.begin(mode)
                }
                _ => {
                    info!(%mode, "Host not active yet, waiting to sign in");
                    inner.state = mode.pending_state();
                    return Ok(StartOutcome::Deferred);
                }
            }
        };

        if let Some(request) = request {
            self.run(request, mode);
        }
        Ok(StartOutcome::Started)
    }

    pub fn start_sign_in(&self, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        self.start(FlowMode::Interactive, handle)
    }

    pub fn start_sign_in_silently(&self, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        self.start(FlowMode::Silent, handle)
    }

    // -----------------------------------------------------------------------
    // Host lifecycle
    // -----------------------------------------------------------------------

    /// The host became active (resumed). Runs a parked request.
    #[instrument(skip(self), fields(host = %self.host))]
    pub fn on_host_active(&self) {
        let begun = {
            let mut inner = self.inner.lock();
            inner.host_active = true;
            match inner.state.pending_mode() {
                Some(mode) => {
                    debug!(state = %inner.state, "Running parked request");
                    let begun = inner.begin(mode).map(|request| (request, mode));
                    if begun.is_none() {
                        inner.state = CoordinatorState::Ready;
                    }
                    begun
                }
                None => {
                    if inner.state != CoordinatorState::Busy {
                        inner.state = CoordinatorState::Ready;
                    }
                    None
                }
            }
        };

        if let Some((request, mode)) = begun {
            self.run(request, mode);
        }
    }

    /// The host started. Reconnects an existing session client.
    pub fn on_host_started(&self) {
        let client = self.inner.lock().client.clone();
        if let Some(client) = client {
            debug!(host = %self.host, "Reconnecting session client");
            client.connect(ConnectMode::Optional);
        }
    }

    /// The host paused or was torn down. The held request survives.
    pub fn on_host_inactive(&self) {
        let mut inner = self.inner.lock();
        inner.host_active = false;
        debug!(host = %self.host, state = %inner.state, "Host inactive");
    }

    /// Result delivered through the host's UI-result channel.
    ///
    /// Returns `false` when `request_code` is not the coordinator's, so the
    /// host can route the result elsewhere.
    #[instrument(skip(self, outcome), fields(host = %self.host, status = %outcome.status))]
    pub fn on_activity_result(&self, request_code: i32, outcome: SignInOutcome) -> bool {
        if request_code != self.request_code {
            debug!(expected = self.request_code, "Ignoring result for another request code");
            return false;
        }

        let id = {
            let inner = self.inner.lock();
            match &inner.held {
                Some(held) if held.dispatched == Some(Dispatched::Interface) && !held.completing => held.request.id(),
                _ => {
                    warn!("No request waiting for a sign-in UI result, discarding");
                    return true;
                }
            }
        };

        if !outcome.is_success() {
            warn!("Sign-in UI reported failure");
        }
        self.complete_current(id, outcome.status, outcome.account);
        true
    }

    // -----------------------------------------------------------------------
    // Sign-out and disconnect
    // -----------------------------------------------------------------------

    /// Cancel the held request, then sign the client out.
    #[instrument(skip(self), fields(host = %self.host))]
    pub fn sign_out(&self) {
        self.clear_request(None, true);
        let client = self.inner.lock().client.clone();
        if let Some(client) = client {
            client.sign_out();
        }
    }

    /// Tear down the client connection. The held request is not canceled.
    pub fn disconnect(&self) {
        let client = self.inner.lock().client.clone();
        match client {
            Some(client) => {
                debug!(host = %self.host, "Disconnecting session client");
                client.disconnect();
            }
            None => debug!(host = %self.host, "Disconnect without a session client"),
        }
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    fn run(&self, request: Arc<TokenRequest>, mode: FlowMode) {
        let id = request.id();
        info!(host = %self.host, request = %request, %mode, "Processing request");

        let client = match self.build_client(&request) {
            Ok(client) => client,
            Err(err) => {
                error!(%err, "Failed to build session client");
                self.complete_current(id, err.status_code(), None);
                return;
            }
        };

        let (previous, current) = {
            let mut inner = self.inner.lock();
            let previous = inner.client.replace(Arc::clone(&client));
            (previous, inner.live(id).is_some())
        };
        if let Some(previous) = previous {
            previous.disconnect();
        }
        if !current {
            debug!(request = %id, "Request finished while the client was being built");
            return;
        }

        client.connect(ConnectMode::Optional);
        self.dispatch(id, Trigger::Processing);
    }

    fn build_client(&self, request: &TokenRequest) -> Result<Arc<dyn SessionClient>, BridgeError> {
        let options = SignInOptionsBuilder::from_configuration(request.configuration(), &self.capabilities)?;
        let events = Arc::new(ClientEvents {
            coordinator: self.me.clone(),
            request: request.id(),
        });
        Ok(self.factory.build(options, events)?)
    }

    /// Hand the request to the SDK flow its mode calls for, at most once.
    fn dispatch(&self, id: RequestId, trigger: Trigger) {
        let (client, mode) = {
            let mut inner = self.inner.lock();
            let Some(client) = inner.client.clone() else {
                return;
            };
            let Some(held) = inner.live(id) else {
                debug!(request = %id, ?trigger, "No live request to dispatch");
                return;
            };
            match (held.mode, held.dispatched) {
                (Some(mode), None) => (client, mode),
                (_, Some(flow)) => {
                    debug!(request = %id, ?flow, ?trigger, "Flow already dispatched");
                    return;
                }
                (None, None) => return,
            }
        };

        let connected = client.has_connected_capability();
        debug!(request = %id, connected, %mode, ?trigger, "Choosing sign-in flow");
        let flow = match (mode, connected) {
            (FlowMode::Silent, _) | (FlowMode::Interactive, true) => Dispatched::SilentReauth,
            (FlowMode::Interactive, false) => Dispatched::Interface,
        };

        if self.claim(id, flow) {
            self.launch(&client, id, flow);
        }
    }

    fn claim(&self, id: RequestId, flow: Dispatched) -> bool {
        let mut inner = self.inner.lock();
        match inner.live(id) {
            Some(held) if held.dispatched.is_none() => {
                held.dispatched = Some(flow);
                true
            }
            _ => false,
        }
    }

    fn launch(&self, client: &Arc<dyn SessionClient>, id: RequestId, flow: Dispatched) {
        match flow {
            Dispatched::SilentReauth => {
                let me = self.me.clone();
                client.silent_sign_in(Box::new(move |outcome: SignInOutcome| {
                    if !outcome.is_success() {
                        error!(request = %id, status = %outcome.status, "Error with silent sign-in");
                    }
                    if let Some(coordinator) = me.upgrade() {
                        coordinator.complete_current(id, outcome.status, outcome.account);
                    }
                }));
            }
            Dispatched::Interface => {
                debug!(request = %id, code = self.request_code, "Launching sign-in UI");
                if let Err(err) = client.launch_sign_in_ui(self.request_code) {
                    error!(%err, "Failed to launch sign-in UI");
                    self.complete_current(id, StatusCode::InternalError, None);
                }
            }
        }
    }

    fn handle_connection_failed(&self, id: RequestId, status: StatusCode, has_resolution: bool) {
        error!(host = %self.host, request = %id, %status, has_resolution, "Connection failed");

        let (client, mode, dispatched) = {
            let mut inner = self.inner.lock();
            let client = inner.client.clone();
            match inner.live(id) {
                Some(held) => (client, held.mode, held.dispatched),
                None => {
                    debug!(request = %id, "Connection failure for a finished request");
                    return;
                }
            }
        };

        // A resolvable failure is handled by the sign-in UI itself.
        if has_resolution && mode == Some(FlowMode::Interactive) {
            if dispatched == Some(Dispatched::Interface) {
                debug!(request = %id, "Sign-in UI already showing, leaving resolution to it");
                return;
            }
            if let Some(client) = client {
                if dispatched.is_none() && self.claim(id, Dispatched::Interface) {
                    self.launch(&client, id, Dispatched::Interface);
                    return;
                }
            }
        }
        self.complete_current(id, status, None);
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Complete the held request if it is still `id` and nothing else
    /// completed it first. Returns whether this call took effect.
    pub fn complete_current(&self, id: RequestId, status: StatusCode, account: Option<SignInAccount>) -> bool {
        let request = {
            let mut inner = self.inner.lock();
            match inner.live(id) {
                Some(held) => {
                    held.completing = true;
                    Arc::clone(&held.request)
                }
                None => {
                    warn!(host = %self.host, request = %id, %status, "Result for a request that is no longer current, dropping");
                    return false;
                }
            }
        };

        debug!(request = %request, %status, has_account = account.is_some(), "Completing request");
        request.complete(status, account);
        true
    }

    /// Drop the held request (only if it is `only`, when given) and return
    /// to idle, canceling it when asked.
    fn clear_request(&self, only: Option<RequestId>, cancel: bool) {
        let taken = {
            let mut inner = self.inner.lock();
            let matches = match (&inner.held, only) {
                (Some(held), Some(id)) => held.request.id() == id,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !matches {
                return;
            }
            inner.state = inner.idle_state();
            inner.held.take()
        };

        if let Some(held) = taken {
            debug!(host = %self.host, request = %held.request, "Cleared request");
            if cancel {
                info!(request = %held.request, "Canceling request");
                held.request.cancel();
            }
        }
    }
}

impl std::fmt::Debug for SignInCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SignInCoordinator")
            .field("host", &self.host)
            .field("state", &inner.state)
            .field("host_active", &inner.host_active)
            .field("request", &inner.held.as_ref().map(|held| held.request.handle()))
            .field("has_client", &inner.client.is_some())
            .finish()
    }
}

/// Connection events of one session client, bound to the request it was
/// built for. Events for a request that is no longer current are dropped.
struct ClientEvents {
    coordinator: Weak<SignInCoordinator>,
    request: RequestId,
}

impl ConnectionEvents for ClientEvents {
    fn on_connected(&self) {
        debug!(request = %self.request, "Session client connected");
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.dispatch(self.request, Trigger::Connected);
        }
    }

    fn on_connection_suspended(&self, cause: i32) {
        debug!(request = %self.request, cause, "Session client connection suspended");
    }

    fn on_connection_failed(&self, status: StatusCode, has_resolution: bool) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.handle_connection_failed(self.request, status, has_resolution);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::{Delivery, SdkCall, SimulatedGames, SimulatedPlatform, demo_account};
    use crate::platform::SIGN_IN_REQUEST_CODE;
    use crate::request::SignInConfiguration;

    #[derive(Default)]
    struct Recorder {
        results: Mutex<Vec<(RequestHandle, StatusCode, Option<String>)>>,
    }

    impl ResultListener for Recorder {
        fn on_result(&self, handle: RequestHandle, status: StatusCode, account: Option<SignInAccount>) {
            self.results.lock().push((handle, status, account.map(|a| a.user_id)));
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<(RequestHandle, StatusCode, Option<String>)> {
            std::mem::take(&mut *self.results.lock())
        }
    }

    struct Fixture {
        platform: SimulatedPlatform,
        recorder: Arc<Recorder>,
        capabilities: Arc<CapabilityRegistry>,
        coordinator: Arc<SignInCoordinator>,
    }

    fn fixture() -> Fixture {
        let platform = SimulatedPlatform::new();
        let recorder = Arc::new(Recorder::default());
        let capabilities = Arc::new(CapabilityRegistry::new());
        let coordinator = SignInCoordinator::new(
            HostId::new("test"),
            Arc::new(platform.clone()),
            Arc::clone(&capabilities),
            recorder.clone(),
            SIGN_IN_REQUEST_CODE,
        );
        Fixture {
            platform,
            recorder,
            capabilities,
            coordinator,
        }
    }

    fn request(handle: i64) -> TokenRequest {
        TokenRequest::new(SignInConfiguration::default(), RequestHandle::new(handle))
    }

    #[test]
    fn test_start_without_request_is_not_configured() {
        let f = fixture();
        let err = f.coordinator.start_sign_in(RequestHandle::new(1)).unwrap_err();
        assert!(matches!(err, BridgeError::NotConfigured));
        assert_eq!(f.coordinator.state(), CoordinatorState::New);
    }

    #[test]
    fn test_submit_rejects_invalid_request() {
        let f = fixture();
        let invalid = TokenRequest::new(
            SignInConfiguration {
                request_auth_code: true,
                ..Default::default()
            },
            RequestHandle::new(1),
        );
        assert!(matches!(
            f.coordinator.submit(invalid),
            Err(BridgeError::InvalidConfiguration(_))
        ));
        assert!(!f.coordinator.has_request());
    }

    #[test]
    fn test_start_before_host_active_defers() {
        let f = fixture();
        f.coordinator.submit(request(1)).unwrap();
        assert_eq!(
            f.coordinator.start_sign_in(RequestHandle::new(1)).unwrap(),
            StartOutcome::Deferred
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Pending);
        assert_eq!(f.platform.build_count(), 0);

        f.coordinator.on_host_active();
        assert_eq!(f.coordinator.state(), CoordinatorState::Busy);
        assert_eq!(f.platform.take_ui_launch(), Some(SIGN_IN_REQUEST_CODE));

        assert!(f.coordinator.on_activity_result(
            SIGN_IN_REQUEST_CODE,
            SignInOutcome::success(demo_account())
        ));
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(1), StatusCode::Success, Some(demo_account().user_id))]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
        assert!(!f.coordinator.has_request());
    }

    #[test]
    fn test_silent_while_connected_relays_outcome() {
        let f = fixture();
        f.platform.set_connected(true);
        f.platform.set_silent_outcome(SignInOutcome::success(demo_account()));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(2)).unwrap();

        assert_eq!(
            f.coordinator.start_sign_in_silently(RequestHandle::new(2)).unwrap(),
            StartOutcome::Started
        );
        assert_eq!(f.platform.count(&SdkCall::SilentSignIn), 1);
        assert_eq!(f.platform.count(&SdkCall::Connect(ConnectMode::Optional)), 1);
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(2), StatusCode::Success, Some(demo_account().user_id))]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_interactive_while_connected_uses_silent_reauth() {
        let f = fixture();
        f.platform.set_connected(true);
        f.platform.set_silent_outcome(SignInOutcome::success(demo_account()));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(3)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(3)).unwrap();

        assert_eq!(f.platform.take_ui_launch(), None);
        assert_eq!(f.recorder.take().len(), 1);
    }

    #[test]
    fn test_busy_rejects_other_handle_and_keeps_request() {
        let f = fixture();
        f.coordinator.on_host_active();
        f.coordinator.submit(request(1)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(1)).unwrap();
        assert_eq!(f.coordinator.state(), CoordinatorState::Busy);

        let err = f.coordinator.submit(request(2)).unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateRequest { .. }));
        let err = f.coordinator.start_sign_in(RequestHandle::new(2)).unwrap_err();
        assert!(matches!(err, BridgeError::Busy { in_flight } if in_flight == RequestHandle::new(1)));
        assert_eq!(
            f.coordinator.start_sign_in(RequestHandle::new(1)).unwrap(),
            StartOutcome::AlreadyRunning
        );
        assert_eq!(f.platform.build_count(), 1);
        assert!(f.recorder.take().is_empty());

        f.coordinator
            .on_activity_result(SIGN_IN_REQUEST_CODE, SignInOutcome::failure(StatusCode::SignInCancelled));
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(1), StatusCode::SignInCancelled, None)]
        );
    }

    #[test]
    fn test_unstarted_request_is_superseded_and_canceled() {
        let f = fixture();
        f.coordinator.on_host_active();
        let first = request(1);
        let first_pending = Arc::clone(first.pending());
        f.coordinator.submit(first).unwrap();
        f.coordinator.submit(request(2)).unwrap();

        assert!(first_pending.is_canceled());
        assert_eq!(f.coordinator.current_handle(), Some(RequestHandle::new(2)));
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(1), StatusCode::Canceled, None)]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_sign_out_cancels_parked_request() {
        let f = fixture();
        f.coordinator.submit(request(1)).unwrap();
        f.coordinator.start_sign_in_silently(RequestHandle::new(1)).unwrap();
        assert_eq!(f.coordinator.state(), CoordinatorState::PendingSilent);

        f.coordinator.sign_out();
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(1), StatusCode::Canceled, None)]
        );
        assert!(!f.coordinator.has_request());
        assert_eq!(f.coordinator.state(), CoordinatorState::New);

        // Nothing is left to run once the host comes back.
        f.coordinator.on_host_active();
        assert_eq!(f.platform.build_count(), 0);
        assert!(f.recorder.take().is_empty());
    }

    #[test]
    fn test_interactive_launches_ui_without_connection_events() {
        let f = fixture();
        f.platform.set_quiet_connect(true);
        f.coordinator.on_host_active();
        f.coordinator.submit(request(16)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(16)).unwrap();

        assert_eq!(f.platform.take_ui_launch(), Some(SIGN_IN_REQUEST_CODE));
        assert_eq!(f.coordinator.state(), CoordinatorState::Busy);

        // A late connection does not show the UI again.
        f.platform.emit_connected();
        assert_eq!(f.platform.count(&SdkCall::LaunchUi(SIGN_IN_REQUEST_CODE)), 1);

        // Nor does a resolvable failure while the UI is up.
        f.platform.emit_connection_failed(StatusCode::ResolutionRequired, true);
        assert!(f.recorder.take().is_empty());

        f.coordinator
            .on_activity_result(SIGN_IN_REQUEST_CODE, SignInOutcome::success(demo_account()));
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(16), StatusCode::Success, Some(demo_account().user_id))]
        );
    }

    #[test]
    fn test_parked_request_blocks_submission() {
        let f = fixture();
        f.coordinator.submit(request(1)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(1)).unwrap();
        assert!(f.coordinator.submit(request(2)).is_err());
        assert_eq!(f.coordinator.current_handle(), Some(RequestHandle::new(1)));
    }

    #[test]
    fn test_first_trigger_wins() {
        let f = fixture();
        f.platform.set_connected(true);
        f.platform.set_delivery(Delivery::Deferred);
        f.platform.set_silent_outcome(SignInOutcome::success(demo_account()));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(4)).unwrap();
        f.coordinator.start_sign_in_silently(RequestHandle::new(4)).unwrap();

        // Connection failure arrives before the silent callback.
        f.platform.emit_connection_failed(StatusCode::NetworkError, false);
        assert_eq!(f.platform.release_deferred(), 1);

        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(4), StatusCode::NetworkError, None)]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_connection_failure_with_resolution_launches_ui() {
        let f = fixture();
        f.platform.fail_connection(Some((StatusCode::ResolutionRequired, true)));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(5)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(5)).unwrap();

        assert_eq!(f.platform.take_ui_launch(), Some(SIGN_IN_REQUEST_CODE));
        assert!(f.recorder.take().is_empty());
        assert_eq!(f.coordinator.state(), CoordinatorState::Busy);
    }

    #[test]
    fn test_connection_failure_in_silent_mode_completes() {
        let f = fixture();
        f.platform.fail_connection(Some((StatusCode::ResolutionRequired, true)));
        f.platform.set_delivery(Delivery::Deferred);
        f.coordinator.on_host_active();
        f.coordinator.submit(request(6)).unwrap();
        f.coordinator.start_sign_in_silently(RequestHandle::new(6)).unwrap();

        assert_eq!(f.platform.take_ui_launch(), None);
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(6), StatusCode::ResolutionRequired, None)]
        );
    }

    #[test]
    fn test_games_without_provider_completes_with_developer_error() {
        let f = fixture();
        f.coordinator.on_host_active();
        let games = TokenRequest::new(
            SignInConfiguration {
                use_games_config: true,
                ..Default::default()
            },
            RequestHandle::new(7),
        );
        f.coordinator.submit(games).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(7)).unwrap();

        assert_eq!(f.platform.build_count(), 0);
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(7), StatusCode::DeveloperError, None)]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_games_api_failure_is_internal_error() {
        let f = fixture();
        f.capabilities
            .register(Arc::new(SimulatedGames { unavailable: true }));
        f.coordinator.on_host_active();
        let games = TokenRequest::new(
            SignInConfiguration {
                use_games_config: true,
                ..Default::default()
            },
            RequestHandle::new(8),
        );
        f.coordinator.submit(games).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(8)).unwrap();
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(8), StatusCode::InternalError, None)]
        );
    }

    #[test]
    fn test_build_failure_is_internal_error() {
        let f = fixture();
        f.platform.fail_build(Some("play services missing"));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(9)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(9)).unwrap();
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(9), StatusCode::InternalError, None)]
        );
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_launch_failure_is_internal_error() {
        let f = fixture();
        f.platform.fail_launch(Some("no activity"));
        f.coordinator.on_host_active();
        f.coordinator.submit(request(10)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(10)).unwrap();
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(10), StatusCode::InternalError, None)]
        );
    }

    #[test]
    fn test_late_ui_result_is_discarded() {
        let f = fixture();
        assert!(f.coordinator.on_activity_result(
            SIGN_IN_REQUEST_CODE,
            SignInOutcome::success(demo_account())
        ));
        assert!(!f.coordinator.on_activity_result(1234, SignInOutcome::success(demo_account())));
        assert!(f.recorder.take().is_empty());
    }

    #[test]
    fn test_sign_out_cancels_in_flight_request() {
        let f = fixture();
        f.coordinator.on_host_active();
        f.coordinator.submit(request(11)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(11)).unwrap();

        f.coordinator.sign_out();
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(11), StatusCode::Canceled, None)]
        );
        assert_eq!(f.platform.count(&SdkCall::SignOut), 1);
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);

        // The UI result for the canceled request arrives late.
        f.coordinator
            .on_activity_result(SIGN_IN_REQUEST_CODE, SignInOutcome::success(demo_account()));
        assert!(f.recorder.take().is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent_and_keeps_request() {
        let f = fixture();
        f.coordinator.disconnect();
        f.coordinator.on_host_active();
        f.coordinator.submit(request(12)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(12)).unwrap();

        f.coordinator.disconnect();
        f.coordinator.disconnect();
        assert_eq!(f.platform.count(&SdkCall::Disconnect), 2);
        assert!(f.coordinator.has_request());
        assert!(f.recorder.take().is_empty());
    }

    #[test]
    fn test_completion_while_host_inactive_returns_to_new() {
        let f = fixture();
        f.coordinator.on_host_active();
        f.coordinator.submit(request(13)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(13)).unwrap();
        f.coordinator.on_host_inactive();

        f.coordinator
            .on_activity_result(SIGN_IN_REQUEST_CODE, SignInOutcome::success(demo_account()));
        assert_eq!(f.coordinator.state(), CoordinatorState::New);
        assert_eq!(f.recorder.take().len(), 1);

        f.coordinator.on_host_active();
        assert_eq!(f.coordinator.state(), CoordinatorState::Ready);
    }

    #[test]
    fn test_host_started_reconnects_client() {
        let f = fixture();
        f.coordinator.on_host_started();
        assert!(f.platform.calls().is_empty());

        f.coordinator.on_host_active();
        f.coordinator.submit(request(14)).unwrap();
        f.coordinator.start_sign_in(RequestHandle::new(14)).unwrap();
        f.coordinator.on_host_started();
        assert_eq!(f.platform.count(&SdkCall::Connect(ConnectMode::Optional)), 2);
        // Reconnecting does not launch the UI a second time.
        assert_eq!(f.platform.count(&SdkCall::LaunchUi(SIGN_IN_REQUEST_CODE)), 1);
    }

    #[test]
    fn test_background_silent_delivery() {
        let f = fixture();
        f.platform.set_delivery(Delivery::Background);
        f.platform.set_silent_outcome(SignInOutcome::failure(StatusCode::SignInRequired));
        f.coordinator.on_host_active();
        let req = request(15);
        let pending = Arc::clone(req.pending());
        f.coordinator.submit(req).unwrap();
        f.coordinator.start_sign_in_silently(RequestHandle::new(15)).unwrap();

        let result = pending.wait_timeout(std::time::Duration::from_secs(5));
        assert_eq!(result.status, StatusCode::SignInRequired);
        // The relay runs after the future's latch opens; give it a moment.
        for _ in 0..100 {
            if !f.recorder.results.lock().is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(
            f.recorder.take(),
            vec![(RequestHandle::new(15), StatusCode::SignInRequired, None)]
        );
    }
}
