//! Channel event model.
//!
//! The channel hands us loosely typed key/value payloads. They are decoded
//! exactly once, here, into a closed [`EventBody`] per [`EventKind`]. Decoding
//! never fails: unknown addresses become [`EventKind::Unknown`] and missing
//! fields fall back to their zero value so that a malformed event is still
//! displayed rather than dropped.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::SYSTEM_NICKNAME;
use crate::types::UserProfile;

/// Every event address the channel can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Join acknowledgement carrying the room history
    JoinUserInit,
    /// Full membership snapshot
    ClientList,
    Message,
    Whisper,
    Notice,
    Custom,
    JoinUser,
    LeaveUser,
    /// Echo of a whisper sent by the local user
    SendWhisper,
    PersonalKickUser,
    PersonalMuteUser,
    PersonalUnmuteUser,
    PersonalDuplicateUser,
    PersonalInvite,
    KickUser,
    UnkickUser,
    MuteUser,
    UnmuteUser,
    Unknown,
}

impl EventKind {
    const ADDRESSES: &'static [(&'static str, EventKind)] = &[
        ("joinUserInit", EventKind::JoinUserInit),
        ("clientList", EventKind::ClientList),
        ("notifyMessage", EventKind::Message),
        ("whisper", EventKind::Whisper),
        ("notice", EventKind::Notice),
        ("custom", EventKind::Custom),
        ("join", EventKind::JoinUser),
        ("leave", EventKind::LeaveUser),
        ("sendWhisper", EventKind::SendWhisper),
        ("personalKickUser", EventKind::PersonalKickUser),
        ("personalMuteUser", EventKind::PersonalMuteUser),
        ("personalUnmuteUser", EventKind::PersonalUnmuteUser),
        ("personalDuplicateUser", EventKind::PersonalDuplicateUser),
        ("personalInvite", EventKind::PersonalInvite),
        ("kickUser", EventKind::KickUser),
        ("unkickUser", EventKind::UnkickUser),
        ("muteUser", EventKind::MuteUser),
        ("unmuteUser", EventKind::UnmuteUser),
    ];

    pub fn from_address(address: &str) -> Self {
        Self::ADDRESSES
            .iter()
            .find(|(a, _)| *a == address)
            .map(|(_, kind)| *kind)
            .unwrap_or(EventKind::Unknown)
    }

    pub fn address(&self) -> &'static str {
        Self::ADDRESSES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(a, _)| *a)
            .unwrap_or("unknown")
    }

    /// Kinds whose body is a chat line (sender + message).
    pub fn carries_chat(&self) -> bool {
        matches!(
            self,
            EventKind::Message
                | EventKind::Whisper
                | EventKind::Notice
                | EventKind::Custom
                | EventKind::JoinUser
                | EventKind::LeaveUser
                | EventKind::SendWhisper
                | EventKind::Unknown
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    #[default]
    Text,
    Emoji,
    File,
}

impl MimeKind {
    /// Unrecognised mime types are shown as text.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "emoji" => MimeKind::Emoji,
            "file" => MimeKind::File,
            _ => MimeKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MimeKind::Text => "text",
            MimeKind::Emoji => "emoji",
            MimeKind::File => "file",
        }
    }
}

/// Body of every chat-line event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatPayload {
    pub nickname: String,
    pub client_key: String,
    /// Text, emoji id, or a JSON-encoded file list for `MimeKind::File`
    pub message: String,
    pub mime: MimeKind,
    pub user_info: Map<String, Value>,
}

impl ChatPayload {
    fn decode(body: &Value) -> Self {
        Self {
            nickname: string_field(body, "nickName")
                .or_else(|| string_field(body, "nickname"))
                .unwrap_or_default(),
            client_key: string_field(body, "clientKey").unwrap_or_default(),
            message: string_field(body, "message").unwrap_or_default(),
            mime: string_field(body, "mimeType")
                .map(|m| MimeKind::from_wire(&m))
                .unwrap_or_default(),
            user_info: object_field(body, "userInfo"),
        }
    }
}

/// User named by a broadcast moderation signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModerationTarget {
    pub nickname: Option<String>,
    pub client_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    Chat(ChatPayload),
    /// Past chat lines in chronological order (oldest first)
    History(Vec<RawEvent>),
    /// Members that decoded successfully, in delivery order
    ClientList(Vec<UserProfile>),
    Moderation(ModerationTarget),
    Invite { room_id: Option<String> },
    Empty,
}

/// One inbound channel event. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub body: EventBody,
}

impl RawEvent {
    /// Decode an event delivered as `(address, body, timestamp)`.
    pub fn decode(address: &str, body: &Value, timestamp: DateTime<Utc>) -> Self {
        let kind = EventKind::from_address(address);
        if kind == EventKind::Unknown {
            debug!(address, "Unknown event address");
        }
        Self::decode_kind(kind, body, timestamp)
    }

    /// Decode a full channel envelope `{ type, address, body, messageDt? }`.
    ///
    /// The timestamp comes from the envelope, then from `body.messageDt`,
    /// then `fallback`.
    pub fn from_envelope(envelope: &Value, fallback: DateTime<Utc>) -> Self {
        let address = envelope
            .get("address")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let body = envelope.get("body").unwrap_or(&Value::Null);
        let timestamp = envelope
            .get("messageDt")
            .and_then(parse_timestamp)
            .or_else(|| body.get("messageDt").and_then(parse_timestamp))
            .unwrap_or(fallback);
        Self::decode(address, body, timestamp)
    }

    fn decode_kind(kind: EventKind, body: &Value, timestamp: DateTime<Utc>) -> Self {
        let body = match kind {
            k if k.carries_chat() => EventBody::Chat(ChatPayload::decode(body)),
            EventKind::JoinUserInit => EventBody::History(decode_history(body, timestamp)),
            EventKind::ClientList => EventBody::ClientList(decode_client_list(body)),
            EventKind::KickUser
            | EventKind::UnkickUser
            | EventKind::MuteUser
            | EventKind::UnmuteUser => EventBody::Moderation(ModerationTarget {
                nickname: string_field(body, "nickName"),
                client_key: string_field(body, "clientKey"),
            }),
            EventKind::PersonalInvite => EventBody::Invite {
                room_id: string_field(body, "roomId"),
            },
            _ => EventBody::Empty,
        };

        Self {
            kind,
            timestamp,
            body,
        }
    }

    /// Build a chat-line event directly.
    pub fn chat(kind: EventKind, payload: ChatPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            body: EventBody::Chat(payload),
        }
    }

    /// Synthesize a system notice with a fixed message.
    pub fn notice(message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::chat(
            EventKind::Notice,
            ChatPayload {
                nickname: SYSTEM_NICKNAME.to_string(),
                client_key: String::new(),
                message: message.into(),
                mime: MimeKind::Text,
                user_info: Map::new(),
            },
            timestamp,
        )
    }

    pub fn chat_payload(&self) -> Option<&ChatPayload> {
        match &self.body {
            EventBody::Chat(payload) => Some(payload),
            _ => None,
        }
    }
}

fn decode_history(body: &Value, timestamp: DateTime<Utc>) -> Vec<RawEvent> {
    let Some(items) = body.get("history").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let ts = item
                .get("messageDt")
                .and_then(parse_timestamp)
                .unwrap_or(timestamp);
            RawEvent::decode_kind(EventKind::Message, item, ts)
        })
        .collect()
}

fn decode_client_list(body: &Value) -> Vec<UserProfile> {
    let Some(members) = body.get("clientlist").and_then(Value::as_array) else {
        return Vec::new();
    };

    members
        .iter()
        .filter_map(|member| {
            let decoded = UserProfile::from_member(member);
            if decoded.is_none() {
                debug!(member = %member, "Dropping client-list member missing required fields");
            }
            decoded
        })
        .collect()
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `userInfo` arrives either as an object or as a JSON-encoded string.
fn object_field(body: &Value, key: &str) -> Map<String, Value> {
    match body.get(key) {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

/// Accepts RFC 3339 strings or epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
