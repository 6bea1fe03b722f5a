use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::SignInCoordinator;
use crate::helper::ResultListener;
use crate::platform::{CapabilityRegistry, SIGN_IN_REQUEST_CODE, SessionClientFactory};

/// Identity of a host container.
///
/// A host that is torn down and recreated keeps its id, so it re-attaches to
/// the coordinator that still holds its request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Process-wide map from host to its coordinator.
pub struct CoordinatorRegistry {
    factory: Arc<dyn SessionClientFactory>,
    capabilities: Arc<CapabilityRegistry>,
    listener: Arc<dyn ResultListener>,
    request_code: i32,
    coordinators: Mutex<HashMap<HostId, Arc<SignInCoordinator>>>,
}

impl CoordinatorRegistry {
    pub fn new(factory: Arc<dyn SessionClientFactory>, listener: Arc<dyn ResultListener>) -> Self {
        Self {
            factory,
            capabilities: Arc::new(CapabilityRegistry::new()),
            listener,
            request_code: SIGN_IN_REQUEST_CODE,
            coordinators: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Arc<CapabilityRegistry>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_request_code(mut self, request_code: i32) -> Self {
        self.request_code = request_code;
        self
    }

    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    pub fn listener(&self) -> &Arc<dyn ResultListener> {
        &self.listener
    }

    /// Coordinator for `host`, creating it on first use.
    pub fn attach(&self, host: &HostId) -> Arc<SignInCoordinator> {
        let mut coordinators = self.coordinators.lock();
        if let Some(existing) = coordinators.get(host) {
            debug!(%host, state = %existing.state(), "Re-attaching to coordinator");
            return Arc::clone(existing);
        }

        info!(%host, "Creating coordinator");
        let coordinator = SignInCoordinator::new(
            host.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.capabilities),
            Arc::clone(&self.listener),
            self.request_code,
        );
        coordinators.insert(host.clone(), Arc::clone(&coordinator));
        coordinator
    }

    pub fn get(&self, host: &HostId) -> Option<Arc<SignInCoordinator>> {
        self.coordinators.lock().get(host).cloned()
    }

    /// The host went away. Its coordinator stays registered with any request
    /// it holds.
    pub fn detach(&self, host: &HostId) {
        match self.get(host) {
            Some(coordinator) => coordinator.on_host_inactive(),
            None => debug!(%host, "Detach for unknown host"),
        }
    }

    /// Remove the coordinator for `host` if it holds no request.
    ///
    /// Returns whether it was removed.
    pub fn release(&self, host: &HostId) -> bool {
        let removed = {
            let mut coordinators = self.coordinators.lock();
            match coordinators.get(host) {
                Some(coordinator) if coordinator.has_request() => {
                    warn!(%host, state = %coordinator.state(), "Not releasing coordinator with a request in flight");
                    return false;
                }
                Some(_) => coordinators.remove(host),
                None => return false,
            }
        };

        if let Some(coordinator) = removed {
            coordinator.disconnect();
            info!(%host, "Released coordinator");
        }
        true
    }

    pub fn len(&self) -> usize {
        self.coordinators.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinators.lock().is_empty()
    }
}

impl fmt::Debug for CoordinatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorRegistry")
            .field("request_code", &self.request_code)
            .field("hosts", &self.coordinators.lock().len())
            .finish_non_exhaustive()
    }
}
