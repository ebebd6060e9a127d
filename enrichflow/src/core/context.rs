//! Context entries contributed by providers.

use super::{Fields, SearchResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback type behind an [`ActionHandle`].
pub type ActionFn = dyn Fn(&SearchResult) + Send + Sync;

/// An opaque callable the UI may invoke for a context action.
#[derive(Clone)]
pub struct ActionHandle(Arc<ActionFn>);

impl ActionHandle {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&SearchResult) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Invokes the callback for the given result.
    pub fn invoke(&self, result: &SearchResult) {
        (self.0)(result);
    }

    /// Returns true if both handles point at the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActionHandle(..)")
    }
}

/// A named callback action attached to a context.
#[derive(Debug, Clone)]
pub struct ContextAction {
    /// Button or menu label.
    pub label: String,
    /// The callback.
    pub handle: ActionHandle,
    /// Optional hover text.
    pub tooltip: Option<String>,
}

impl ContextAction {
    /// Creates an action without a tooltip.
    pub fn new(label: impl Into<String>, handle: ActionHandle) -> Self {
        Self {
            label: label.into(),
            handle,
            tooltip: None,
        }
    }

    /// Sets the tooltip.
    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

#[derive(Debug)]
struct ContextInner {
    provider: String,
    term: String,
    data: Fields,
    actions: Vec<ContextAction>,
}

/// One unit of supplementary information from one provider for one result.
///
/// Immutable once built; clones share the same payload.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Starts building a context for `provider`, keyed on `term`.
    pub fn builder(provider: impl Into<String>, term: impl Into<String>) -> ContextBuilder {
        ContextBuilder {
            provider: provider.into(),
            term: term.into(),
            data: Fields::new(),
            actions: Vec::new(),
        }
    }

    /// Display name of the contributing provider.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.inner.provider
    }

    /// The term or value this context was keyed on.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.inner.term
    }

    /// The data context (label to value).
    #[must_use]
    pub fn data(&self) -> &Fields {
        &self.inner.data
    }

    /// The callback actions.
    #[must_use]
    pub fn actions(&self) -> &[ContextAction] {
        &self.inner.actions
    }

    /// Returns true if both values share the same payload.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Converts to a dictionary representation. Action handles are omitted.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("provider".to_string(), serde_json::json!(self.provider()));
        map.insert("term".to_string(), serde_json::json!(self.term()));
        map.insert(
            "data".to_string(),
            serde_json::to_value(self.data()).unwrap_or(serde_json::Value::Null),
        );
        map.insert(
            "actions".to_string(),
            serde_json::Value::Array(
                self.actions()
                    .iter()
                    .map(|a| serde_json::json!({"label": a.label, "tooltip": a.tooltip}))
                    .collect(),
            ),
        );
        map
    }
}

/// Builder for [`Context`].
#[derive(Debug)]
pub struct ContextBuilder {
    provider: String,
    term: String,
    data: Fields,
    actions: Vec<ContextAction>,
}

impl ContextBuilder {
    /// Adds a data entry.
    #[must_use]
    pub fn data(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(label, value);
        self
    }

    /// Adds an action.
    #[must_use]
    pub fn action(mut self, action: ContextAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Finishes the context.
    #[must_use]
    pub fn build(self) -> Context {
        Context {
            inner: Arc::new(ContextInner {
                provider: self.provider,
                term: self.term,
                data: self.data,
                actions: self.actions,
            }),
        }
    }
}
