//! Search results handed to the pipeline by the search collaborator.

use super::{Context, Fields};
use uuid::Uuid;

/// One matched row from the search collaborator.
///
/// `search_id` is fixed at construction. Contexts can only be appended, and
/// only by the enrichment worker that owns the result during a run.
#[derive(Debug, Clone)]
pub struct SearchResult {
    search_id: String,
    source: String,
    fields: Fields,
    contexts: Vec<Context>,
}

impl SearchResult {
    /// Creates a result with a freshly generated identifier.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), source)
    }

    /// Creates a result with a caller-supplied identifier.
    pub fn with_id(search_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            search_id: search_id.into(),
            source: source.into(),
            fields: Fields::new(),
            contexts: Vec::new(),
        }
    }

    /// Adds a matched column value.
    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column, value);
        self
    }

    /// Replaces all matched column values.
    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// The stable identifier.
    #[must_use]
    pub fn search_id(&self) -> &str {
        &self.search_id
    }

    /// The source or document name.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Matched column values, in column order.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Attached contexts, in attachment order.
    #[must_use]
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Contexts contributed by one provider.
    pub fn contexts_from<'a>(&'a self, provider: &'a str) -> impl Iterator<Item = &'a Context> + 'a {
        self.contexts.iter().filter(move |c| c.provider() == provider)
    }

    pub(crate) fn attach_context(&mut self, context: Context) {
        self.contexts.push(context);
    }
}
