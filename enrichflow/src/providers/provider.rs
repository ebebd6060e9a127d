//! The context provider capability.

use crate::core::{Context, SearchResult};
use crate::errors::ProviderError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for pluggable context providers.
///
/// A provider inspects one [`SearchResult`] and contributes zero or more
/// [`Context`] entries. Implementations may block on I/O inside
/// `get_context`; the worker awaits each call before moving on.
#[async_trait]
pub trait ContextProvider: Send + Sync + Debug {
    /// Display name, used in contexts and error events.
    fn name(&self) -> &str;

    /// Whether the provider should be consulted. Checked before every call.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Produces contexts for `result`.
    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError>;
}

/// A provider shared between the registry and running workers.
pub type SharedProvider = Arc<dyn ContextProvider>;

/// Returns true if both handles refer to the same provider instance.
#[must_use]
pub fn same_provider(a: &SharedProvider, b: &SharedProvider) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

/// A provider backed by a synchronous closure.
pub struct FnProvider<F>
where
    F: Fn(&SearchResult) -> Result<Vec<Context>, ProviderError> + Send + Sync,
{
    name: String,
    enabled: AtomicBool,
    func: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&SearchResult) -> Result<Vec<Context>, ProviderError> + Send + Sync,
{
    /// Creates an enabled closure-backed provider.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(true),
            func,
        }
    }

    /// Enables or disables the provider.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl<F> Debug for FnProvider<F>
where
    F: Fn(&SearchResult) -> Result<Vec<Context>, ProviderError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[async_trait]
impl<F> ContextProvider for FnProvider<F>
where
    F: Fn(&SearchResult) -> Result<Vec<Context>, ProviderError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        (self.func)(result)
    }
}
