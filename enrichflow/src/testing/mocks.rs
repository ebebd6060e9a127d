//! Mock context providers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

use crate::cancellation::{CancelReason, CancellationToken};
use crate::core::{Context, SearchResult};
use crate::errors::ProviderError;
use crate::providers::ContextProvider;

/// A provider that attaches one context per configured term to every result.
#[derive(Debug)]
pub struct StaticProvider {
    name: String,
    terms: Vec<String>,
}

impl StaticProvider {
    /// Creates a provider returning contexts for `terms`.
    #[must_use]
    pub fn new<S: Into<String>>(name: impl Into<String>, terms: Vec<S>) -> Self {
        Self {
            name: name.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a provider that never attaches anything.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::<String>::new())
    }
}

#[async_trait]
impl ContextProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        Ok(self
            .terms
            .iter()
            .map(|term| {
                Context::builder(&self.name, term)
                    .data("search_id", result.search_id())
                    .build()
            })
            .collect())
    }
}

/// A provider whose every call fails.
#[derive(Debug)]
pub struct FailingProvider {
    name: String,
    reported_name: String,
    message: String,
}

impl FailingProvider {
    /// Creates a failing provider.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            reported_name: name.clone(),
            name,
            message: message.into(),
        }
    }

    /// Puts a different provider name inside the returned error.
    #[must_use]
    pub fn reporting_as(mut self, name: impl Into<String>) -> Self {
        self.reported_name = name.into();
        self
    }
}

#[async_trait]
impl ContextProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, _result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        Err(ProviderError::new(&self.reported_name, &self.message))
    }
}

/// A provider that panics on every call.
#[derive(Debug)]
pub struct PanickingProvider {
    name: String,
}

impl PanickingProvider {
    /// Creates a panicking provider.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ContextProvider for PanickingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        panic!("{} cannot handle {}", self.name, result.search_id());
    }
}

/// A provider that sleeps before returning one context.
#[derive(Debug)]
pub struct SlowProvider {
    name: String,
    delay: Duration,
}

impl SlowProvider {
    /// Creates a slow provider.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }

    /// Creates a slow provider with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, Duration::from_millis(ms))
    }
}

#[async_trait]
impl ContextProvider for SlowProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, _result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Context::builder(&self.name, "slow").build()])
    }
}

/// A provider that can be switched on and off and counts its calls.
///
/// It may also cancel a token when called, to stop a run from inside a
/// provider call.
#[derive(Debug)]
pub struct ToggleProvider {
    name: String,
    enabled: AtomicBool,
    call_count: Mutex<usize>,
    cancel_target: Mutex<Option<Arc<CancellationToken>>>,
}

impl ToggleProvider {
    /// Creates a toggle provider.
    #[must_use]
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled: AtomicBool::new(enabled),
            call_count: Mutex::new(0),
            cancel_target: Mutex::new(None),
        }
    }

    /// Switches the provider on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Stops `token` whenever the provider is called.
    pub fn cancel_on_call(&self, token: Arc<CancellationToken>) {
        *self.cancel_target.lock() = Some(token);
    }

    /// Returns the number of times the provider was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl ContextProvider for ToggleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn get_context(&self, _result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        *self.call_count.lock() += 1;
        if let Some(token) = self.cancel_target.lock().as_ref() {
            token.cancel(CancelReason::Stopped);
        }
        Ok(Vec::new())
    }
}

/// A provider that logs `name:search_id` into a shared journal.
#[derive(Debug)]
pub struct RecordingProvider {
    name: String,
    journal: Arc<Mutex<Vec<String>>>,
}

impl RecordingProvider {
    /// Creates a recording provider writing into `journal`.
    #[must_use]
    pub fn new(name: impl Into<String>, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            journal,
        }
    }
}

#[async_trait]
impl ContextProvider for RecordingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        self.journal
            .lock()
            .push(format!("{}:{}", self.name, result.search_id()));
        Ok(Vec::new())
    }
}

/// A provider whose calls block until the test releases them.
///
/// Lets a test hold a run at a known point, then stop or replace it.
#[derive(Debug)]
pub struct GatedProvider {
    name: String,
    permits: Semaphore,
    calls: AtomicUsize,
    entered: Notify,
}

impl GatedProvider {
    /// Creates a provider with every call blocked.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permits: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
        }
    }

    /// Lets `n` more calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Lets every pending and future call through.
    pub fn release_all(&self) {
        self.permits.close();
    }

    /// Number of calls that have started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` calls have started.
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let entered = self.entered.notified();
            if self.call_count() >= n {
                return;
            }
            entered.await;
        }
    }

    /// Waits until the first call has started.
    pub async fn wait_until_entered(&self) {
        self.wait_for_calls(1).await;
    }
}

#[async_trait]
impl ContextProvider for GatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_context(&self, result: &SearchResult) -> Result<Vec<Context>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_waiters();
        // A closed semaphore means release_all.
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
        Ok(vec![Context::builder(&self.name, result.search_id()).build()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_results;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticProvider::new("Static", vec!["a", "b"]);
        let result = SearchResult::with_id("r1", "source");

        let contexts = provider.get_context(&result).await.unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[1].term(), "b");
        assert_eq!(contexts[0].data().get("search_id"), Some("r1"));
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = FailingProvider::new("Fail", "offline").reporting_as("Other");
        let err = provider.get_context(&SearchResult::new("s")).await.unwrap_err();
        assert_eq!(err.provider, "Other");
        assert_eq!(err.message, "offline");
        assert_eq!(provider.name(), "Fail");
    }

    #[tokio::test]
    async fn test_slow_provider() {
        let provider = SlowProvider::with_delay_ms("slow", 10);

        let start = std::time::Instant::now();
        let contexts = provider.get_context(&SearchResult::new("s")).await.unwrap();

        assert_eq!(contexts.len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_toggle_provider() {
        let provider = ToggleProvider::new("Toggle", false);
        assert!(!provider.is_enabled());
        provider.set_enabled(true);
        assert!(provider.is_enabled());

        let token = Arc::new(CancellationToken::new());
        provider.cancel_on_call(token.clone());
        provider.get_context(&SearchResult::new("s")).await.unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(token.reason(), Some(CancelReason::Stopped));
    }

    #[tokio::test]
    async fn test_gated_provider_release() {
        let provider = Arc::new(GatedProvider::new("Gated"));
        let results = sample_results(2);

        let p = provider.clone();
        let first = tokio::spawn(async move { p.get_context(&results[0]).await });
        provider.wait_until_entered().await;
        assert!(!first.is_finished());

        provider.release(1);
        let contexts = first.await.unwrap().unwrap();
        assert_eq!(contexts[0].term(), "result-0");

        provider.release_all();
        let contexts = provider.get_context(&SearchResult::new("s")).await.unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(provider.call_count(), 2);
    }
}
