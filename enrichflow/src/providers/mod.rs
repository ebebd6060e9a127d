//! Context providers and the registry that holds them.

mod provider;
mod registry;

pub use provider::{same_provider, ContextProvider, FnProvider, SharedProvider};
pub use registry::ProviderRegistry;
