//! Boundary facade.
//!
//! [`SignInHelper`] is what the calling layer talks to. Every request it
//! accepts is answered exactly once through [`ResultListener::on_result`];
//! a request it cannot accept is answered immediately with the status of the
//! error that stopped it.

use std::sync::Arc;
use tracing::{debug, error};

use crate::account::SignInAccount;
use crate::coordinator::{CoordinatorRegistry, FlowMode, HostId, SignInCoordinator, StartOutcome};
use crate::error::BridgeError;
use crate::handle::RequestHandle;
use crate::logging;
use crate::request::{SignInConfiguration, TokenRequest};
use crate::status::StatusCode;

/// Receives results on the calling-layer side of the boundary.
///
/// Invoked from whichever thread completed the request.
pub trait ResultListener: Send + Sync {
    fn on_result(&self, handle: RequestHandle, status: StatusCode, account: Option<SignInAccount>);
}

/// Entry points for the calling layer.
#[derive(Debug, Clone)]
pub struct SignInHelper {
    registry: Arc<CoordinatorRegistry>,
}

impl SignInHelper {
    pub fn new(registry: Arc<CoordinatorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CoordinatorRegistry> {
        &self.registry
    }

    /// Coordinator for `host`.
    pub fn coordinator(&self, host: &HostId) -> Arc<SignInCoordinator> {
        self.registry.attach(host)
    }

    /// Validate `configuration` and submit it as the request for `handle`.
    ///
    /// On failure the listener has already been told; the error is returned
    /// for callers that want it.
    pub fn configure(
        &self,
        host: &HostId,
        configuration: SignInConfiguration,
        handle: RequestHandle,
    ) -> Result<(), BridgeError> {
        let request = TokenRequest::new(configuration, handle);
        debug!(%host, %handle, request = %request, "Configuring sign-in");

        let submitted = self.coordinator(host).submit(request);
        if let Err(err) = &submitted {
            error!(%host, %handle, %err, "Rejecting sign-in configuration");
            self.reject(handle, err);
        }
        submitted
    }

    /// Start the interactive flow for the configured request.
    pub fn sign_in(&self, host: &HostId, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        self.start(host, FlowMode::Interactive, handle)
    }

    /// Start the silent flow for the configured request.
    pub fn sign_in_silently(&self, host: &HostId, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        self.start(host, FlowMode::Silent, handle)
    }

    pub fn sign_out(&self, host: &HostId) {
        self.coordinator(host).sign_out();
    }

    pub fn disconnect(&self, host: &HostId) {
        self.coordinator(host).disconnect();
    }

    /// Raise or restore the bridge's log level at runtime.
    pub fn enable_debug_logging(&self, enabled: bool) {
        logging::set_debug_logging(enabled);
    }

    fn start(&self, host: &HostId, mode: FlowMode, handle: RequestHandle) -> Result<StartOutcome, BridgeError> {
        let started = self.coordinator(host).start(mode, handle);
        if let Err(err) = &started {
            error!(%host, %handle, %mode, %err, "Sign-in could not start");
            self.reject(handle, err);
        }
        started
    }

    fn reject(&self, handle: RequestHandle, err: &BridgeError) {
        self.registry.listener().on_result(handle, err.status_code(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorState;
    use crate::platform::SIGN_IN_REQUEST_CODE;
    use crate::platform::simulated::{SdkCall, SimulatedPlatform, demo_account};
    use crate::platform::SignInOutcome;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        results: Mutex<Vec<(RequestHandle, StatusCode)>>,
    }

    impl ResultListener for Recorder {
        fn on_result(&self, handle: RequestHandle, status: StatusCode, _account: Option<SignInAccount>) {
            self.results.lock().push((handle, status));
        }
    }

    fn helper() -> (SignInHelper, SimulatedPlatform, Arc<Recorder>) {
        let platform = SimulatedPlatform::new();
        let recorder = Arc::new(Recorder::default());
        let registry = CoordinatorRegistry::new(Arc::new(platform.clone()), recorder.clone());
        (SignInHelper::new(Arc::new(registry)), platform, recorder)
    }

    #[test]
    fn test_invalid_configuration_reports_developer_error() {
        let (helper, platform, recorder) = helper();
        let host = HostId::new("main");
        let config = SignInConfiguration {
            request_id_token: true,
            ..Default::default()
        };

        assert!(helper.configure(&host, config, RequestHandle::new(1)).is_err());
        assert_eq!(
            *recorder.results.lock(),
            vec![(RequestHandle::new(1), StatusCode::DeveloperError)]
        );
        assert!(platform.calls().is_empty());
        assert!(!helper.coordinator(&host).has_request());
    }

    #[test]
    fn test_sign_in_without_configure_reports_developer_error() {
        let (helper, _platform, recorder) = helper();
        assert!(helper.sign_in(&HostId::new("main"), RequestHandle::new(3)).is_err());
        assert_eq!(
            *recorder.results.lock(),
            vec![(RequestHandle::new(3), StatusCode::DeveloperError)]
        );
    }

    #[test]
    fn test_rejected_submission_does_not_disturb_running_request() {
        let (helper, platform, recorder) = helper();
        let host = HostId::new("main");
        helper.coordinator(&host).on_host_active();

        helper
            .configure(&host, SignInConfiguration::default(), RequestHandle::new(1))
            .unwrap();
        helper.sign_in(&host, RequestHandle::new(1)).unwrap();
        assert_eq!(helper.coordinator(&host).state(), CoordinatorState::Busy);

        assert!(helper
            .configure(&host, SignInConfiguration::default(), RequestHandle::new(2))
            .is_err());
        assert_eq!(
            *recorder.results.lock(),
            vec![(RequestHandle::new(2), StatusCode::DeveloperError)]
        );

        helper
            .coordinator(&host)
            .on_activity_result(SIGN_IN_REQUEST_CODE, SignInOutcome::success(demo_account()));
        assert_eq!(
            *recorder.results.lock(),
            vec![
                (RequestHandle::new(2), StatusCode::DeveloperError),
                (RequestHandle::new(1), StatusCode::Success),
            ]
        );
        assert_eq!(platform.count(&SdkCall::LaunchUi(SIGN_IN_REQUEST_CODE)), 1);
    }

    #[test]
    fn test_sign_out_and_disconnect_forward() {
        let (helper, platform, recorder) = helper();
        let host = HostId::new("main");
        helper.coordinator(&host).on_host_active();
        helper
            .configure(&host, SignInConfiguration::default(), RequestHandle::new(5))
            .unwrap();
        helper.sign_in_silently(&host, RequestHandle::new(5)).unwrap();
        assert_eq!(
            *recorder.results.lock(),
            vec![(RequestHandle::new(5), StatusCode::SignInRequired)]
        );

        helper.sign_out(&host);
        helper.disconnect(&host);
        helper.disconnect(&host);
        assert_eq!(platform.count(&SdkCall::SignOut), 1);
        assert_eq!(platform.count(&SdkCall::Disconnect), 2);
        assert_eq!(recorder.results.lock().len(), 1);
    }
}
