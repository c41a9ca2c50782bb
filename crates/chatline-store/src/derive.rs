//! Projection of a raw event into a [`DisplayEntry`].

use serde_json::Value;
use tracing::debug;

use chatline_shared::{ChatPayload, EntryId, MimeKind, RawEvent};

use crate::models::{DisplayEntry, EntryKind, FileRef};

/// Derive the displayable entry for `raw`.
///
/// `prev` and `next` are the entries the new one will sit between; only
/// their sender key and timestamp are copied. Neither neighbor is mutated:
/// patching their links back to the new entry is the timeline's job.
///
/// Pure and deterministic: the same inputs always yield the same entry.
pub fn derive_entry(
    id: EntryId,
    raw: &RawEvent,
    prev: Option<&DisplayEntry>,
    next: Option<&DisplayEntry>,
    local_user_key: &str,
) -> DisplayEntry {
    let kind = EntryKind::from_event(raw.kind);
    let fallback = ChatPayload::default();
    let payload = raw.chat_payload().unwrap_or(&fallback);

    // Identity is meaningless for layout grouping of system-origin rows.
    let sender_key = if kind.is_anonymous() {
        String::new()
    } else {
        payload.client_key.clone()
    };

    let file = match payload.mime {
        MimeKind::File => parse_file_list(&payload.message),
        _ => None,
    };

    let is_self = !sender_key.is_empty() && sender_key == local_user_key;

    DisplayEntry {
        id,
        kind,
        sender_name: payload.nickname.clone(),
        sender_key,
        message: payload.message.clone(),
        file,
        mime: payload.mime,
        sent_at: raw.timestamp,
        user_info: payload.user_info.clone(),
        is_self,
        is_hidden: false,
        is_translated: false,
        prev_sender_key: prev.map(|p| p.sender_key.clone()),
        next_sender_key: next.map(|n| n.sender_key.clone()),
        prev_sent_at: prev.map(|p| p.sent_at),
        next_sent_at: next.map(|n| n.sent_at),
    }
}

/// File messages carry a JSON-encoded array; the first element is the file.
/// An empty or undecodable list yields no file reference.
fn parse_file_list(message: &str) -> Option<FileRef> {
    match serde_json::from_str::<Value>(message) {
        Ok(Value::Array(items)) => items.first().map(FileRef::from_value),
        Ok(_) | Err(_) => {
            debug!(len = message.len(), "File message is not a JSON array");
            None
        }
    }
}
