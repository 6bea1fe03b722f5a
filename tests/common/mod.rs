use parking_lot::Mutex;
use std::sync::Arc;

use signin_bridge::coordinator::{CoordinatorRegistry, HostId, SignInCoordinator};
use signin_bridge::platform::CapabilityRegistry;
use signin_bridge::platform::simulated::SimulatedPlatform;
use signin_bridge::{RequestHandle, ResultListener, SignInAccount, SignInHelper, StatusCode};

/// One `on_result` call as seen across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub handle: RequestHandle,
    pub status: StatusCode,
    pub user_id: Option<String>,
}

#[derive(Default)]
pub struct RecordingListener {
    delivered: Mutex<Vec<Delivered>>,
}

impl RecordingListener {
    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().clone()
    }

    pub fn for_handle(&self, handle: i64) -> Vec<Delivered> {
        self.delivered
            .lock()
            .iter()
            .filter(|d| d.handle == RequestHandle::new(handle))
            .cloned()
            .collect()
    }
}

impl ResultListener for RecordingListener {
    fn on_result(&self, handle: RequestHandle, status: StatusCode, account: Option<SignInAccount>) {
        self.delivered.lock().push(Delivered {
            handle,
            status,
            user_id: account.map(|a| a.user_id),
        });
    }
}

pub struct Harness {
    pub host: HostId,
    pub platform: SimulatedPlatform,
    pub listener: Arc<RecordingListener>,
    pub helper: SignInHelper,
}

impl Harness {
    pub fn new() -> Self {
        let platform = SimulatedPlatform::new();
        let listener = Arc::new(RecordingListener::default());
        let registry = CoordinatorRegistry::new(Arc::new(platform.clone()), listener.clone())
            .with_capabilities(Arc::new(CapabilityRegistry::new()));
        Self {
            host: HostId::new("activity"),
            platform,
            listener,
            helper: SignInHelper::new(Arc::new(registry)),
        }
    }

    pub fn coordinator(&self) -> Arc<SignInCoordinator> {
        self.helper.coordinator(&self.host)
    }
}

pub fn delivered(handle: i64, status: StatusCode, user_id: Option<&str>) -> Delivered {
    Delivered {
        handle: RequestHandle::new(handle),
        status,
        user_id: user_id.map(str::to_string),
    }
}
