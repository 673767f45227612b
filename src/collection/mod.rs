pub mod catalog;
mod dispatcher;
mod errors;
pub mod kv_store;
pub mod models;
pub mod photo;
pub mod projection;
mod sqlite_kv_store;
mod store;

pub use catalog::{ItemId, TOTAL};
pub use dispatcher::{Dispatcher, Intent, Outcome, ViewSession};
pub use errors::CollectionError;
pub use kv_store::{InMemoryKeyValueStore, KeyValueStore};
pub use models::{CollectionState, ImageRef, Snapshot};
pub use projection::{Counters, Filter, Projection};
pub use sqlite_kv_store::{SqliteKeyValueStore, DB_FILE_NAME};
pub use store::CollectionStore;
