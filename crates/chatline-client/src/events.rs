use serde::Serialize;
use tokio::sync::broadcast;

use chatline_store::{DisplayEntry, RoomState};

/// Change notifications published by a session to UI consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionNotification {
    EntryAppended { entry: DisplayEntry },
    EntryPrepended { entry: DisplayEntry },
    /// Text translated, entry hidden, or neighbor links rewritten by an
    /// insert next to it
    EntryUpdated { entry: DisplayEntry },
    RosterChanged { count: usize },
    /// Counters changed outside a roster snapshot
    RoomChanged { room: RoomState },
    SenderBlocked { sender_key: String },
    Disconnected { reason: String, code: u16 },
    TimelineCleared,
}

pub fn emit(tx: &broadcast::Sender<SessionNotification>, notification: SessionNotification) {
    if tx.send(notification).is_err() {
        tracing::trace!("No notification subscribers");
    }
}
