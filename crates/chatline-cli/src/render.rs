//! Plain-text rendering of a timeline snapshot.

use chrono::Local;

use chatline_shared::MimeKind;
use chatline_store::{DisplayEntry, EntryKind, RoomState};

/// Render entries in display order, one or two lines each. Grouped
/// messages omit the sender header, and the `[HH:MM]` suffix appears only
/// where the entry's timestamp flag is set.
pub fn render_timeline(entries: &[DisplayEntry]) -> Vec<String> {
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.kind {
            EntryKind::Notice => lines.push(format!("-- {} --", entry.message)),
            EntryKind::Join => lines.push(format!("-> {} joined", entry.sender_name)),
            EntryKind::Leave => lines.push(format!("<- {} left", entry.sender_name)),
            EntryKind::Message | EntryKind::Whisper | EntryKind::Unknown => {
                if entry.show_sender_header() {
                    lines.push(format!("{}:", entry.sender_label()));
                } else if entry.show_self_header() {
                    lines.push(format!("{} (you):", entry.sender_label()));
                }
                lines.push(body_line(entry));
            }
        }
    }
    lines
}

fn body_line(entry: &DisplayEntry) -> String {
    let mut line = match (entry.mime, &entry.file) {
        (MimeKind::File, Some(file)) => format!("  [file] {} ({} bytes)", file.name, file.size),
        (MimeKind::Emoji, _) => format!("  [emoji] {}", entry.message),
        _ => format!("  {}", entry.message),
    };
    if entry.is_translated {
        line.push_str(" (translated)");
    }
    if entry.show_timestamp() {
        let local = entry.sent_at.with_timezone(&Local);
        line.push_str(&format!(" [{}]", local.format("%H:%M")));
    }
    line
}

pub fn render_room(room: &RoomState) -> String {
    let mut line = format!("room {}", room.room_key);
    if !room.title.is_empty() {
        line.push_str(&format!(" \"{}\"", room.title));
    }
    line.push_str(&format!(" | members {}", room.member_count_label()));
    if room.user_max > 0 {
        line.push_str(&format!("/{:03}", room.user_max));
    }
    line.push_str(&format!(" | likes {}", room.like_count_label()));
    if !room.room_type.is_empty() {
        line.push_str(&format!(" | type {}", room.room_type));
    }
    if room.is_locked() {
        line.push_str(" | locked");
    }
    line
}
