//! # chatline-store
//!
//! In-memory chat timeline for a single room session.
//!
//! Raw channel events are projected into [`DisplayEntry`] values by the
//! entry deriver and kept in an id-addressed arena by [`Timeline`], which
//! maintains the prev/next neighbor links used for grouping and time-label
//! display. The crate is synchronous and performs no I/O; callers are
//! expected to serialize all mutation onto one logical writer.

pub mod derive;
pub mod models;
pub mod preferences;
pub mod room;
pub mod roster;
pub mod timeline;

mod error;

pub use derive::derive_entry;
pub use error::{Result, StoreError};
pub use models::*;
pub use preferences::TranslationPreferences;
pub use room::RoomState;
pub use roster::Roster;
pub use timeline::Timeline;
