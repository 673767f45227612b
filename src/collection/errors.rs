use super::catalog::{ItemId, TOTAL};
use thiserror::Error;

/// Errors raised by collection operations. None of them leaves the collection
/// partially modified.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Item {0} is not part of the album (valid items are 1..={})", TOTAL)]
    UnknownItem(ItemId),

    #[error("Item {0} has a stock image, a custom photo can't be attached")]
    PhotoNotAllowed(ItemId),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}
