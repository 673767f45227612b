//! Album tracker library
//!
//! Collection state, its persistence and the surfaces driving it.

pub mod collection;
pub mod config;
pub mod server;
pub mod sqlite_persistence;

pub use collection::{CollectionError, CollectionStore, Dispatcher, Intent, Outcome};
pub use server::{run_server, RequestsLoggingLevel};
