//! Core value types: search results, contexts, run ids and events.

mod context;
mod event;
mod fields;
mod result;
mod status;

pub use context::{ActionFn, ActionHandle, Context, ContextAction, ContextBuilder};
pub use event::EnrichmentEvent;
pub use fields::Fields;
pub use result::SearchResult;
pub use status::{RunId, RunStatus};
