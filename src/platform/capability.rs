//! Optional SDK capabilities.
//!
//! Some configurations need SDK modules that not every host ships, such as
//! the games extension. A host that has one registers a provider for it at
//! startup; asking for a capability nobody registered is a configuration
//! error rather than something discovered while a request is in flight.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{OptionsExtension, PlatformError};
use crate::error::BridgeError;

/// Name the games capability is registered under.
pub const GAMES_CAPABILITY: &str = "games";

/// Supplies the SDK pieces for one optional capability.
pub trait CapabilityProvider: Send + Sync {
    /// Registry key, e.g. [`GAMES_CAPABILITY`].
    fn name(&self) -> &str;

    /// Identifier of the API the session client must add.
    fn api(&self) -> Result<String, PlatformError>;

    /// Sign-in options extension for this capability.
    fn options_extension(&self, show_connecting_popup: bool) -> Result<OptionsExtension, PlatformError>;
}

/// Capabilities registered by the host.
#[derive(Default)]
pub struct CapabilityRegistry {
    providers: RwLock<HashMap<String, Arc<dyn CapabilityProvider>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one with the same name.
    pub fn register(&self, provider: Arc<dyn CapabilityProvider>) {
        let name = provider.name().to_string();
        debug!(capability = %name, "Registering capability provider");
        self.providers.write().insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityProvider>> {
        self.providers.read().get(name).cloned()
    }

    /// Look up a provider that the current request cannot do without.
    pub fn require(&self, name: &str) -> Result<Arc<dyn CapabilityProvider>, BridgeError> {
        self.get(name)
            .ok_or_else(|| BridgeError::MissingCapability(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.read().contains_key(name)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers = self.providers.read();
        let mut names: Vec<&str> = providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CapabilityRegistry")
            .field("providers", &names)
            .finish()
    }
}
