// ── Domain model ──
//
// Resource kinds and the page window handed to list consumers. Rows
// themselves are the wire `Item` type; the backend's fields are already
// the dashboard's fields.

mod page;
mod resource;

pub use nutridash_api::Item;
pub use page::PageWindow;
pub use resource::ResourceKind;
