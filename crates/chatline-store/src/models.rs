//! Displayable projections of channel events.
//!
//! Every struct derives `Serialize` so it can be handed directly to a UI
//! layer.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use chatline_shared::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use chatline_shared::{EntryId, EventKind, MimeKind};

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// How an entry is laid out in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Message,
    Whisper,
    Notice,
    Join,
    Leave,
    Unknown,
}

impl EntryKind {
    pub fn from_event(kind: EventKind) -> Self {
        match kind {
            EventKind::Message => EntryKind::Message,
            EventKind::Whisper | EventKind::SendWhisper => EntryKind::Whisper,
            EventKind::Notice => EntryKind::Notice,
            EventKind::JoinUser => EntryKind::Join,
            EventKind::LeaveUser => EntryKind::Leave,
            _ => EntryKind::Unknown,
        }
    }

    /// Kinds rendered without per-user attribution.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, EntryKind::Notice | EntryKind::Join | EntryKind::Leave)
    }
}

// ---------------------------------------------------------------------------
// FileRef
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Other,
}

/// Reference to an uploaded file shared in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    /// Expiry stamp as provided by the file service (opaque)
    pub expire: String,
    /// Opaque download key
    pub key: String,
    pub extension: String,
}

impl FileRef {
    /// Decode one element of a file-message list.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            name: text("name"),
            size: value.get("size").and_then(Value::as_u64).unwrap_or(0),
            expire: text("expire"),
            key: text("id"),
            extension: text("type"),
        }
    }

    pub fn category(&self) -> FileCategory {
        let ext = self.extension.trim_start_matches('.').to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Video
        } else {
            FileCategory::Other
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayEntry
// ---------------------------------------------------------------------------

/// A timeline row derived from one raw event.
///
/// The `prev_*` / `next_*` fields mirror the adjacent entries and exist only
/// to compute display flags. They are written by the timeline when a
/// neighbor is inserted, never by the entry's own derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub sender_name: String,
    /// Empty for notices, joins and leaves
    pub sender_key: String,
    pub message: String,
    /// Present only for file messages with a non-empty file list
    pub file: Option<FileRef>,
    pub mime: MimeKind,
    pub sent_at: DateTime<Utc>,
    pub user_info: Map<String, Value>,
    /// Fixed at creation
    pub is_self: bool,
    /// Local-only suppression; the entry stays in the timeline
    pub is_hidden: bool,
    pub is_translated: bool,
    pub prev_sender_key: Option<String>,
    pub next_sender_key: Option<String>,
    pub prev_sent_at: Option<DateTime<Utc>>,
    pub next_sent_at: Option<DateTime<Utc>>,
}

impl DisplayEntry {
    pub fn is_prev_same_minute(&self) -> bool {
        same_minute(self.prev_sent_at, Some(self.sent_at))
    }

    pub fn is_next_same_minute(&self) -> bool {
        same_minute(self.next_sent_at, Some(self.sent_at))
    }

    fn starts_group(&self) -> bool {
        self.prev_sender_key.as_deref() != Some(self.sender_key.as_str())
            || !self.is_prev_same_minute()
            || self.kind == EntryKind::Whisper
    }

    /// Show avatar and nickname above a message from another user.
    pub fn show_sender_header(&self) -> bool {
        !self.is_self && self.starts_group()
    }

    /// Show the header above one of the local user's own messages.
    pub fn show_self_header(&self) -> bool {
        self.is_self && self.starts_group()
    }

    /// Show the time label: the next entry is from someone else or from a
    /// different minute. Always true for the last entry.
    pub fn show_timestamp(&self) -> bool {
        self.next_sender_key.as_deref() != Some(self.sender_key.as_str())
            || !self.is_next_same_minute()
    }

    /// Nickname line, phrased by direction for whispers.
    pub fn sender_label(&self) -> String {
        match (self.kind, self.is_self) {
            (EntryKind::Whisper, true) => format!("to {}", self.sender_name),
            (EntryKind::Whisper, false) => format!("from {}", self.sender_name),
            _ => self.sender_name.clone(),
        }
    }

    pub fn profile_image(&self) -> &str {
        self.user_info
            .get("profile")
            .and_then(Value::as_str)
            .unwrap_or("1")
    }
}

/// True when both timestamps exist and fall in the same local-calendar minute.
pub fn same_minute(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    let (a, b) = (a.with_timezone(&Local), b.with_timezone(&Local));
    a.date_naive() == b.date_naive()
        && a.hour() == b.hour()
        && a.minute() == b.minute()
}
