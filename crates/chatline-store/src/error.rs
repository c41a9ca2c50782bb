use chatline_shared::EntryId;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// No entry with this id is present in the timeline.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
