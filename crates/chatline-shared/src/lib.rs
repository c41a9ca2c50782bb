//! Types shared by every chatline crate: the decoded channel event model,
//! identity types, constants and error enums.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use protocol::{ChatPayload, EventBody, EventKind, MimeKind, ModerationTarget, RawEvent};
pub use types::{EntryId, UserProfile};
