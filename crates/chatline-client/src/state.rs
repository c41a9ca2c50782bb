//! Session state owned by the session actor.
//!
//! [`SessionState`] is plain synchronous data; the actor in
//! [`crate::session`] is its only writer.

use chrono::{DateTime, Utc};
use tracing::debug;

use chatline_shared::{EntryId, RawEvent, UserProfile};
use chatline_store::{DisplayEntry, RoomState, Roster, Timeline, TranslationPreferences};

use crate::dispatch::{disconnect_notice, route_event, Route};
use crate::translate::{plan_translation, TranslationJob};

/// Effect of applying one route, reported back to the actor.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Appended(DisplayEntry),
    Prepended(DisplayEntry),
    /// An existing entry's prev/next links were rewritten by an insert
    NeighborPatched(EntryId),
    RosterReplaced { count: usize },
}

/// Everything one room session knows.
pub struct SessionState {
    /// Identity provided at session start
    pub local_user: UserProfile,

    pub room: RoomState,

    pub timeline: Timeline,

    pub roster: Roster,

    /// Survives `clear`; only changed by explicit user action
    pub preferences: TranslationPreferences,

    pub is_connected: bool,
}

impl SessionState {
    pub fn new(local_user: UserProfile, room: RoomState) -> Self {
        let timeline = Timeline::new(local_user.client_key.clone());
        Self {
            local_user,
            room,
            timeline,
            roster: Roster::new(),
            preferences: TranslationPreferences::new(),
            is_connected: true,
        }
    }

    /// Route and apply one inbound event.
    pub fn handle_event(&mut self, raw: RawEvent) -> Vec<Change> {
        let route = route_event(raw, &self.local_user.client_key);
        self.apply(route)
    }

    /// Record a channel disconnect with a notice. The caller clears the
    /// timeline separately.
    pub fn handle_disconnect(&mut self, reason: &str, code: u16, at: DateTime<Utc>) -> Vec<Change> {
        self.is_connected = false;
        self.apply(disconnect_notice(reason, code, at))
    }

    pub fn apply(&mut self, route: Route) -> Vec<Change> {
        match route {
            Route::PrependHistory(items) => {
                debug!(count = items.len(), "Replaying history");
                let mut changes = Vec::with_capacity(items.len() * 2);
                for raw in items {
                    let patched = self.timeline.first().map(|e| e.id);
                    changes.push(Change::Prepended(self.timeline.prepend_history(raw)));
                    changes.extend(patched.map(Change::NeighborPatched));
                }
                changes
            }
            Route::ReplaceRoster(members) => {
                let count = self.roster.replace(members);
                self.room.member_count = count;
                vec![Change::RosterReplaced { count }]
            }
            Route::AppendLive(raw) => {
                let patched = self.timeline.last().map(|e| e.id);
                let mut changes = vec![Change::Appended(self.timeline.append_live(raw))];
                changes.extend(patched.map(Change::NeighborPatched));
                changes
            }
            Route::Ignore => Vec::new(),
        }
    }

    /// Translation to schedule for a live entry, if its sender opted in.
    pub fn translation_for(&self, entry: &DisplayEntry) -> Option<TranslationJob> {
        plan_translation(entry, &self.preferences, &self.room.room_key)
    }

    /// Drop the timeline, roster and room details. The room reference is
    /// reset but the local identity is not; translation preferences are
    /// kept as well.
    pub fn clear(&mut self) {
        self.timeline.clear();
        self.roster.clear();
        self.room = RoomState::default();
        self.is_connected = false;
    }
}
