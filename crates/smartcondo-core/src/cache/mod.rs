//! Local persistence for the console.
//!
//! - `CachedData`: a value stamped with the time it was cached
//! - `SessionStore`: the key/value store the statement screen uses to
//!   survive remounts, with `FileStore` (one JSON file per key under the
//!   cache directory) and `MemoryStore` implementations
//!
//! The file store is wiped on logout, so its contents never outlive a
//! login session.

pub mod entry;
pub mod store;

pub use entry::CachedData;
pub use store::{FileStore, MemoryStore, SessionStore};
