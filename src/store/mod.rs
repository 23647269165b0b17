//! # Stores
//!
//! Explicit client-side state containers over the backend API. A store is
//! created for a route and dropped when the route is left; nothing here is
//! global.
//!
//! Every store follows the same rules:
//!
//! - `fetch*` loads a collection or resource into state;
//! - mutations call the backend, then patch local state;
//! - a failure records its message in `error` and leaves the previous state
//!   untouched.
//!
//! | Store | State |
//! |-------|-------|
//! | [`DocumentStore`] | document list, the open document, its autosave |
//! | [`TemplateStore`] | template list, per-id cache |
//! | [`NotificationStore`] | notifications, unread count |
//! | [`BulkStagingStore`] | rows of one bulk-creation staging set |

pub mod autosave;
mod bulk;
mod document;
mod notification;
mod template;

pub use autosave::{AutosaveHandle, Debounce, SaveState, SaveStatus};
pub use bulk::{BulkStagingState, BulkStagingStore};
pub use document::{DocumentState, DocumentStore};
pub use notification::{NotificationState, NotificationStore};
pub use template::{TemplateState, TemplateStore};
