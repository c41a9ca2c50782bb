use serde::Serialize;
use serde_json::Value;

/// Chat room metadata. Owned by the session, not the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomState {
    pub room_key: String,
    pub title: String,
    pub member_count: usize,
    /// Number of likes the room has received
    pub like_count: u32,
    /// Opaque room type code from the room-info lookup
    pub room_type: String,
    /// Non-empty when the room is locked
    pub lock_type: String,
    /// Member cap, 0 when unlimited
    pub user_max: u32,
}

impl RoomState {
    pub fn new(room_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            room_key: room_key.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Merge a room-info object (`title`, `roomType`, `lockType`,
    /// `userMax`). Absent or mistyped fields leave the current value.
    pub fn apply_info(&mut self, info: &Value) {
        let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
        if let Some(title) = text("title") {
            self.title = title;
        }
        if let Some(room_type) = text("roomType") {
            self.room_type = room_type;
        }
        if let Some(lock_type) = text("lockType") {
            self.lock_type = lock_type;
        }
        if let Some(max) = info.get("userMax").and_then(Value::as_u64) {
            self.user_max = u32::try_from(max).unwrap_or(u32::MAX);
        }
    }

    pub fn is_locked(&self) -> bool {
        !self.lock_type.is_empty()
    }

    /// Member count zero-padded to three digits.
    pub fn member_count_label(&self) -> String {
        format!("{:03}", self.member_count)
    }

    /// Like count zero-padded to three digits.
    pub fn like_count_label(&self) -> String {
        format!("{:03}", self.like_count)
    }
}
