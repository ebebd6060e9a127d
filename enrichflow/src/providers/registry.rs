//! Registry of active context providers.

use super::provider::{same_provider, SharedProvider};
use parking_lot::RwLock;
use tracing::debug;

/// Registry for context providers.
///
/// Providers are kept in registration order, which is also the order the
/// worker consults them in. Identity is pointer identity of the shared
/// handle, so two distinct instances with the same name can coexist.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<SharedProvider>>,
}

impl ProviderRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider. Returns false if this instance is already registered.
    pub fn register(&self, provider: SharedProvider) -> bool {
        let mut providers = self.providers.write();
        if providers.iter().any(|p| same_provider(p, &provider)) {
            return false;
        }
        debug!(provider = %provider.name(), "Registered context provider");
        providers.push(provider);
        true
    }

    /// Unregisters a provider. Returns false if it was not registered.
    pub fn unregister(&self, provider: &SharedProvider) -> bool {
        let mut providers = self.providers.write();
        let before = providers.len();
        providers.retain(|p| !same_provider(p, provider));
        let removed = providers.len() != before;
        if removed {
            debug!(provider = %provider.name(), "Unregistered context provider");
        }
        removed
    }

    /// Returns the providers registered right now, in registration order.
    ///
    /// The returned list is independent of later registry changes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SharedProvider> {
        self.providers.read().clone()
    }

    /// Looks up the first provider with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedProvider> {
        self.providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Lists provider names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Removes every provider.
    pub fn clear(&self) {
        self.providers.write().clear();
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
