//! In-process stand-in for the sign-in SDK.
//!
//! Used by the demo host and the tests. Every call is recorded, and the
//! outcome of each SDK operation is scripted up front. Callbacks and
//! connection events are never invoked while the script lock is held, so a
//! coordinator is free to call back into the client from them.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::{
    CapabilityProvider, ConnectMode, ConnectionEvents, GAMES_CAPABILITY, OptionsExtension, OutcomeCallback,
    PlatformError, SessionClient, SessionClientFactory, SignInOptions, SignInOutcome,
};
use crate::account::SignInAccount;
use crate::status::StatusCode;

/// When the silent sign-in callback runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Inside `silent_sign_in`, on the calling thread.
    #[default]
    Inline,
    /// Held until [`SimulatedPlatform::release_deferred`].
    Deferred,
    /// On a freshly spawned thread.
    Background,
}

/// One recorded SDK call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    Build,
    Connect(ConnectMode),
    Disconnect,
    SilentSignIn,
    LaunchUi(i32),
    SignOut,
}

struct Script {
    connected: bool,
    build_failure: Option<String>,
    launch_failure: Option<String>,
    connection_failure: Option<(StatusCode, bool)>,
    /// `connect` reports nothing back.
    quiet_connect: bool,
    silent_outcome: SignInOutcome,
    ui_outcome: SignInOutcome,
    delivery: Delivery,
    deferred: Vec<(OutcomeCallback, SignInOutcome)>,
    ui_launches: VecDeque<i32>,
    calls: Vec<SdkCall>,
    built: Vec<SignInOptions>,
    events: Option<Arc<dyn ConnectionEvents>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            connected: false,
            build_failure: None,
            launch_failure: None,
            connection_failure: None,
            quiet_connect: false,
            silent_outcome: SignInOutcome::failure(StatusCode::SignInRequired),
            ui_outcome: SignInOutcome::success(demo_account()),
            delivery: Delivery::Inline,
            deferred: Vec::new(),
            ui_launches: VecDeque::new(),
            calls: Vec::new(),
            built: Vec::new(),
            events: None,
        }
    }
}

/// The account the simulated interactive flow signs in by default.
pub fn demo_account() -> SignInAccount {
    SignInAccount::new("108234567890")
        .with_email("player@example.com")
        .with_display_name("Demo Player")
}

/// Scripted SDK. Clones share the same script.
#[derive(Clone, Default)]
pub struct SimulatedPlatform {
    script: Arc<Mutex<Script>>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Scripting --

    /// Whether built clients report an already authenticated user.
    pub fn set_connected(&self, connected: bool) {
        self.script.lock().connected = connected;
    }

    pub fn set_silent_outcome(&self, outcome: SignInOutcome) {
        self.script.lock().silent_outcome = outcome;
    }

    /// Outcome a host should forward after an interactive launch.
    pub fn set_ui_outcome(&self, outcome: SignInOutcome) {
        self.script.lock().ui_outcome = outcome;
    }

    pub fn set_delivery(&self, delivery: Delivery) {
        self.script.lock().delivery = delivery;
    }

    /// Make the next builds fail. `None` clears the failure.
    pub fn fail_build(&self, message: Option<&str>) {
        self.script.lock().build_failure = message.map(str::to_string);
    }

    pub fn fail_launch(&self, message: Option<&str>) {
        self.script.lock().launch_failure = message.map(str::to_string);
    }

    /// Report a connection failure on every `connect`. `None` clears it.
    pub fn fail_connection(&self, failure: Option<(StatusCode, bool)>) {
        self.script.lock().connection_failure = failure;
    }

    /// Make `connect` emit neither `on_connected` nor a failure.
    pub fn set_quiet_connect(&self, quiet: bool) {
        self.script.lock().quiet_connect = quiet;
    }

    // -- Inspection --

    pub fn calls(&self) -> Vec<SdkCall> {
        self.script.lock().calls.clone()
    }

    pub fn count(&self, call: &SdkCall) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn build_count(&self) -> usize {
        self.script.lock().built.len()
    }

    /// Options of the most recently built client.
    pub fn last_options(&self) -> Option<SignInOptions> {
        self.script.lock().built.last().cloned()
    }

    pub fn ui_outcome(&self) -> SignInOutcome {
        self.script.lock().ui_outcome.clone()
    }

    /// Pop the oldest interactive launch that has not been answered yet.
    pub fn take_ui_launch(&self) -> Option<i32> {
        self.script.lock().ui_launches.pop_front()
    }

    // -- Driving --

    /// Run every held silent sign-in callback. Returns how many ran.
    pub fn release_deferred(&self) -> usize {
        let deferred = std::mem::take(&mut self.script.lock().deferred);
        let count = deferred.len();
        for (callback, outcome) in deferred {
            callback(outcome);
        }
        count
    }

    /// Report `on_connected` to the most recently built client's owner.
    pub fn emit_connected(&self) {
        let events = self.script.lock().events.clone();
        if let Some(events) = events {
            events.on_connected();
        }
    }

    pub fn emit_connection_failed(&self, status: StatusCode, has_resolution: bool) {
        let events = self.script.lock().events.clone();
        if let Some(events) = events {
            events.on_connection_failed(status, has_resolution);
        }
    }

    pub fn emit_connection_suspended(&self, cause: i32) {
        let events = self.script.lock().events.clone();
        if let Some(events) = events {
            events.on_connection_suspended(cause);
        }
    }
}

impl SessionClientFactory for SimulatedPlatform {
    fn build(
        &self,
        options: SignInOptions,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<Arc<dyn SessionClient>, PlatformError> {
        let mut script = self.script.lock();
        script.calls.push(SdkCall::Build);
        if let Some(message) = &script.build_failure {
            return Err(PlatformError::new(message.clone()));
        }
        debug!(base = ?options.base, apis = options.apis.len(), "Building simulated session client");
        script.built.push(options);
        script.events = Some(Arc::clone(&events));
        Ok(Arc::new(SimulatedClient {
            script: Arc::clone(&self.script),
            events,
        }))
    }
}

/// Session client handed out by [`SimulatedPlatform`].
pub struct SimulatedClient {
    script: Arc<Mutex<Script>>,
    events: Arc<dyn ConnectionEvents>,
}

impl SessionClient for SimulatedClient {
    fn connect(&self, mode: ConnectMode) {
        let (failure, quiet) = {
            let mut script = self.script.lock();
            script.calls.push(SdkCall::Connect(mode));
            (script.connection_failure, script.quiet_connect)
        };
        if quiet {
            debug!(?mode, "Simulated connect reports nothing");
            return;
        }
        match failure {
            Some((status, has_resolution)) => self.events.on_connection_failed(status, has_resolution),
            None => self.events.on_connected(),
        }
    }

    fn disconnect(&self) {
        self.script.lock().calls.push(SdkCall::Disconnect);
    }

    fn has_connected_capability(&self) -> bool {
        self.script.lock().connected
    }

    fn silent_sign_in(&self, done: OutcomeCallback) {
        let (outcome, delivery) = {
            let mut script = self.script.lock();
            script.calls.push(SdkCall::SilentSignIn);
            (script.silent_outcome.clone(), script.delivery)
        };
        match delivery {
            Delivery::Inline => done(outcome),
            Delivery::Deferred => self.script.lock().deferred.push((done, outcome)),
            Delivery::Background => {
                std::thread::spawn(move || done(outcome));
            }
        }
    }

    fn launch_sign_in_ui(&self, request_code: i32) -> Result<(), PlatformError> {
        let mut script = self.script.lock();
        script.calls.push(SdkCall::LaunchUi(request_code));
        if let Some(message) = &script.launch_failure {
            return Err(PlatformError::new(message.clone()));
        }
        script.ui_launches.push_back(request_code);
        Ok(())
    }

    fn sign_out(&self) {
        let mut script = self.script.lock();
        script.calls.push(SdkCall::SignOut);
        script.connected = false;
    }
}

/// Games capability backed by the simulated SDK.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGames {
    /// Make `api()` fail the way a missing games module would.
    pub unavailable: bool,
}

impl CapabilityProvider for SimulatedGames {
    fn name(&self) -> &str {
        GAMES_CAPABILITY
    }

    fn api(&self) -> Result<String, PlatformError> {
        if self.unavailable {
            return Err(PlatformError::new("games API requested, but the games module is not available"));
        }
        Ok("games.API".to_string())
    }

    fn options_extension(&self, show_connecting_popup: bool) -> Result<OptionsExtension, PlatformError> {
        Ok(OptionsExtension::new(GAMES_CAPABILITY)
            .with_property("show_connecting_popup", show_connecting_popup.to_string()))
    }
}
