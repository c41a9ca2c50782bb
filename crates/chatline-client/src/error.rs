use thiserror::Error;

use chatline_store::StoreError;

/// Errors returned by [`crate::SessionHandle`] calls.
#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    /// The session actor has stopped and no longer accepts commands.
    #[error("Session is shut down")]
    Shutdown,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
