//! eoscript Store
//!
//! The editable session: script text, run configuration and the services
//! published by the last successful run.
//!
//! All writes go through [`SessionStore`], which applies the invalidation
//! rules in one place: changing the collection, time window or cloud cover
//! drops the published services in the same update, so a stale map layer is
//! never shown next to a new configuration.
//!
//! The persisted subset of the state is written to a [`SessionStorage`] after
//! every change and read back by [`SessionStore::open`].

mod debounce;
mod error;
mod state;
mod storage;
mod store;

pub use debounce::{Debouncer, EditorSync};
pub use error::StoreError;
pub use state::{PersistedSession, ResetDefaults, SessionState};
pub use storage::{FsStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
