//! Ordered chat timeline.
//!
//! Entries live in an arena keyed by [`EntryId`]; the display order is a
//! separate deque of ids, kept in lockstep with the raw event deque. Neighbor
//! links are plain values copied from the adjacent entry, so no entry ever
//! holds a reference to another.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use chatline_shared::{EntryId, RawEvent};

use crate::derive::derive_entry;
use crate::error::{Result, StoreError};
use crate::models::{DisplayEntry, FileCategory, FileRef};

#[derive(Debug, Clone)]
pub struct Timeline {
    local_user_key: String,
    raw: VecDeque<RawEvent>,
    order: VecDeque<EntryId>,
    entries: HashMap<EntryId, DisplayEntry>,
    /// Senders whose entries are suppressed until the next `clear`
    blocked: HashSet<String>,
    next_id: u64,
}

impl Timeline {
    pub fn new(local_user_key: impl Into<String>) -> Self {
        Self {
            local_user_key: local_user_key.into(),
            raw: VecDeque::new(),
            order: VecDeque::new(),
            entries: HashMap::new(),
            blocked: HashSet::new(),
            next_id: 1,
        }
    }

    pub fn local_user_key(&self) -> &str {
        &self.local_user_key
    }

    fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a live event at the end of the timeline.
    ///
    /// The current last entry becomes the new entry's `prev`, and its own
    /// `next_*` links are patched to point at the new entry.
    pub fn append_live(&mut self, raw: RawEvent) -> DisplayEntry {
        let id = self.allocate_id();

        if self.raw.back() == Some(&raw) {
            // No dedup at this layer; make redelivery visible in logs.
            debug!(kind = ?raw.kind, "Appending event identical to the previous one");
        }

        let prev_id = self.order.back().copied();
        let prev = prev_id.and_then(|pid| self.entries.get(&pid));
        let entry = derive_entry(id, &raw, prev, None, &self.local_user_key);

        if let Some(prev) = prev_id.and_then(|pid| self.entries.get_mut(&pid)) {
            prev.next_sender_key = Some(entry.sender_key.clone());
            prev.next_sent_at = Some(entry.sent_at);
        }

        self.raw.push_back(raw);
        self.order.push_back(id);
        self.entries.insert(id, entry.clone());
        entry
    }

    /// Insert a history event at the front of the timeline.
    ///
    /// Mirror of [`append_live`](Self::append_live). Callers replaying a
    /// chronological history must feed it newest first.
    pub fn prepend_history(&mut self, raw: RawEvent) -> DisplayEntry {
        let id = self.allocate_id();

        let next_id = self.order.front().copied();
        let next = next_id.and_then(|nid| self.entries.get(&nid));
        let entry = derive_entry(id, &raw, None, next, &self.local_user_key);

        if let Some(next) = next_id.and_then(|nid| self.entries.get_mut(&nid)) {
            next.prev_sender_key = Some(entry.sender_key.clone());
            next.prev_sent_at = Some(entry.sent_at);
        }

        self.raw.push_front(raw);
        self.order.push_front(id);
        self.entries.insert(id, entry.clone());
        entry
    }

    /// Drop every entry, raw event and block. Ids are not reused afterwards.
    pub fn clear(&mut self) {
        debug!(entries = self.order.len(), "Clearing timeline");
        self.raw.clear();
        self.order.clear();
        self.entries.clear();
        self.blocked.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&DisplayEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Current position of an entry. Positions shift on prepend; use ids
    /// for identity.
    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.order.iter().position(|e| *e == id)
    }

    pub fn first(&self) -> Option<&DisplayEntry> {
        self.order.front().and_then(|id| self.entries.get(id))
    }

    pub fn last(&self) -> Option<&DisplayEntry> {
        self.order.back().and_then(|id| self.entries.get(id))
    }

    /// All entries in display order, hidden ones included.
    pub fn iter(&self) -> impl Iterator<Item = &DisplayEntry> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Raw events in the same order as [`iter`](Self::iter).
    pub fn raw_events(&self) -> impl Iterator<Item = &RawEvent> + '_ {
        self.raw.iter()
    }

    /// Entries that should be rendered: not hidden and not from a blocked
    /// sender.
    pub fn visible(&self) -> impl Iterator<Item = &DisplayEntry> + '_ {
        self.iter()
            .filter(|e| !e.is_hidden && !self.blocked.contains(&e.sender_key))
    }

    pub fn snapshot(&self) -> Vec<DisplayEntry> {
        self.iter().cloned().collect()
    }

    /// Locally suppress an entry without removing it.
    pub fn hide(&mut self, id: EntryId) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(StoreError::EntryNotFound(id))?;
        entry.is_hidden = true;
        Ok(())
    }

    /// Suppress every entry from `sender_key` until the timeline is cleared.
    /// Returns `false` if the key was already blocked or is empty.
    pub fn block(&mut self, sender_key: impl Into<String>) -> bool {
        let sender_key = sender_key.into();
        if sender_key.is_empty() {
            return false;
        }
        self.blocked.insert(sender_key)
    }

    pub fn is_blocked(&self, sender_key: &str) -> bool {
        self.blocked.contains(sender_key)
    }

    /// Replace an entry's text with its translation.
    ///
    /// Returns `false` when the entry is gone, in which case nothing changes.
    pub fn apply_translation(&mut self, id: EntryId, text: String) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.message = text;
                entry.is_translated = true;
                true
            }
            None => false,
        }
    }

    /// Files shared in the room, newest first, optionally restricted to one
    /// category.
    pub fn files(&self, category: Option<FileCategory>) -> Vec<&FileRef> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.entries.get(id))
            .filter_map(|e| e.file.as_ref())
            .filter(|f| category.map_or(true, |c| f.category() == c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_shared::{ChatPayload, EventKind, MimeKind};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn event(kind: EventKind, key: &str, message: &str, secs: i64) -> RawEvent {
        RawEvent::chat(
            kind,
            ChatPayload {
                nickname: format!("nick-{key}"),
                client_key: key.to_string(),
                message: message.to_string(),
                ..Default::default()
            },
            base() + Duration::seconds(secs),
        )
    }

    fn message(key: &str, text: &str, secs: i64) -> RawEvent {
        event(EventKind::Message, key, text, secs)
    }

    fn assert_linked(timeline: &Timeline) {
        let entries = timeline.snapshot();
        for (i, entry) in entries.iter().enumerate() {
            match i.checked_sub(1).and_then(|p| entries.get(p)) {
                Some(prev) => {
                    assert_eq!(entry.prev_sender_key.as_deref(), Some(prev.sender_key.as_str()));
                    assert_eq!(entry.prev_sent_at, Some(prev.sent_at));
                }
                None => assert!(entry.prev_sender_key.is_none()),
            }
            match entries.get(i + 1) {
                Some(next) => {
                    assert_eq!(entry.next_sender_key.as_deref(), Some(next.sender_key.as_str()));
                    assert_eq!(entry.next_sent_at, Some(next.sent_at));
                }
                None => assert!(entry.next_sender_key.is_none()),
            }
        }
    }

    #[test]
    fn test_append_maintains_neighbor_links() {
        let mut timeline = Timeline::new("me");
        let keys = ["a", "b", "b", "me", "a", "c", "c"];
        for (i, key) in keys.iter().enumerate() {
            timeline.append_live(message(key, "x", i as i64 * 20));
        }

        assert_eq!(timeline.len(), keys.len());
        assert_eq!(timeline.raw_events().count(), keys.len());
        assert_linked(&timeline);
    }

    #[test]
    fn test_prepend_maintains_neighbor_links() {
        let mut timeline = Timeline::new("me");
        timeline.append_live(message("live", "now", 300));
        for (i, key) in ["c", "b", "a"].iter().enumerate() {
            timeline.prepend_history(message(key, "old", 100 - i as i64 * 10));
        }

        let keys: Vec<_> = timeline.iter().map(|e| e.sender_key.clone()).collect();
        assert_eq!(keys, ["a", "b", "c", "live"]);
        assert_linked(&timeline);
    }

    #[test]
    fn test_single_prepend_matches_single_append() {
        let raw = message("a", "hello", 0);

        let mut appended = Timeline::new("me");
        let mut prepended = Timeline::new("me");
        let a = appended.append_live(raw.clone());
        let p = prepended.prepend_history(raw);

        assert_eq!(appended.len(), 1);
        assert_eq!(prepended.len(), 1);
        assert_eq!(a, p);
        assert_eq!(appended.snapshot(), prepended.snapshot());
    }

    #[test]
    fn test_raw_and_display_sequences_align() {
        let mut timeline = Timeline::new("me");
        timeline.append_live(message("b", "2", 20));
        timeline.prepend_history(message("a", "1", 10));
        timeline.append_live(message("c", "3", 30));

        let raw_keys: Vec<_> = timeline
            .raw_events()
            .map(|r| r.chat_payload().unwrap().client_key.clone())
            .collect();
        let entry_keys: Vec<_> = timeline.iter().map(|e| e.sender_key.clone()).collect();
        assert_eq!(raw_keys, entry_keys);
    }

    #[test]
    fn test_ids_unique_and_not_reused_after_clear() {
        let mut timeline = Timeline::new("me");
        let first = timeline.append_live(message("a", "1", 0)).id;
        let second = timeline.prepend_history(message("a", "0", 0)).id;
        assert_ne!(first, second);

        timeline.block("a");
        timeline.clear();
        assert!(timeline.is_empty());
        assert_eq!(timeline.raw_events().count(), 0);
        assert!(!timeline.is_blocked("a"));

        let third = timeline.append_live(message("a", "2", 0)).id;
        assert!(third != first && third != second);
        assert!(!timeline.contains(first));
    }

    #[test]
    fn test_duplicate_delivery_is_appended_twice() {
        let mut timeline = Timeline::new("me");
        let raw = message("a", "dup", 0);
        timeline.append_live(raw.clone());
        timeline.append_live(raw);
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_grouping_scenario() {
        let mut timeline = Timeline::new("me");
        timeline.append_live(event(EventKind::JoinUser, "A", "", 0));
        timeline.append_live(message("A", "hi", 10));
        timeline.append_live(message("A", "yo", 20));

        let entries = timeline.snapshot();
        let headers: Vec<_> = entries.iter().map(|e| e.show_sender_header()).collect();
        assert_eq!(headers, [true, true, false]);

        // The join row has no sender, so it differs from the next message's.
        let times: Vec<_> = entries.iter().map(|e| e.show_timestamp()).collect();
        assert_eq!(times, [true, false, true]);
    }

    #[test]
    fn test_new_minute_starts_new_group() {
        let mut timeline = Timeline::new("me");
        timeline.append_live(message("A", "one", 0));
        timeline.append_live(message("A", "two", 61));

        let entries = timeline.snapshot();
        assert!(entries[0].show_timestamp());
        assert!(entries[1].show_sender_header());
    }

    #[test]
    fn test_self_header_and_whisper() {
        let mut timeline = Timeline::new("me");
        timeline.append_live(message("me", "one", 0));
        timeline.append_live(message("me", "two", 5));
        timeline.append_live(event(EventKind::Whisper, "me", "three", 6));

        let entries = timeline.snapshot();
        assert!(entries.iter().all(|e| !e.show_sender_header()));
        let self_headers: Vec<_> = entries.iter().map(|e| e.show_self_header()).collect();
        assert_eq!(self_headers, [true, false, true]);
        assert_eq!(entries[2].sender_label(), "to nick-me");
    }

    #[test]
    fn test_hide_and_block_only_affect_visibility() {
        let mut timeline = Timeline::new("me");
        let hidden = timeline.append_live(message("a", "1", 0)).id;
        timeline.append_live(message("b", "2", 1));
        timeline.append_live(message("c", "3", 2));

        timeline.hide(hidden).unwrap();
        assert!(timeline.block("b"));
        assert!(!timeline.block("b"));
        assert!(!timeline.block(""));

        assert_eq!(timeline.len(), 3);
        let visible: Vec<_> = timeline.visible().map(|e| e.sender_key.clone()).collect();
        assert_eq!(visible, ["c"]);

        assert_eq!(
            timeline.hide(EntryId(999)),
            Err(StoreError::EntryNotFound(EntryId(999)))
        );
    }

    #[test]
    fn test_apply_translation_by_identity() {
        let mut timeline = Timeline::new("me");
        let id = timeline.append_live(message("a", "hola", 0)).id;
        timeline.prepend_history(message("z", "older", -10));

        assert!(timeline.apply_translation(id, "hello".into()));
        let entry = timeline.get(id).unwrap();
        assert_eq!(entry.message, "hello");
        assert!(entry.is_translated);
        assert_eq!(timeline.position(id), Some(1));

        timeline.clear();
        assert!(!timeline.apply_translation(id, "late".into()));
    }

    #[test]
    fn test_files_newest_first_by_category() {
        let mut timeline = Timeline::new("me");
        let mut push_file = |name: &str, ext: &str, secs: i64| {
            let mut raw = message("a", &format!(r#"[{{"name":"{name}","type":"{ext}"}}]"#), secs);
            if let chatline_shared::EventBody::Chat(payload) = &mut raw.body {
                payload.mime = MimeKind::File;
            }
            timeline.append_live(raw);
        };
        push_file("a.png", "png", 0);
        push_file("b.mp4", "mp4", 1);
        push_file("c.jpg", "jpg", 2);

        let images: Vec<_> = timeline
            .files(Some(FileCategory::Image))
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(images, ["c.jpg", "a.png"]);
        assert_eq!(timeline.files(None).len(), 3);
    }
}
