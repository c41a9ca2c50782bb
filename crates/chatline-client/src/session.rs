//! Single-writer room session.
//!
//! All timeline, roster and room mutation happens inside one actor task that
//! drains a command queue in order. Channel events, user actions and
//! translation completions are all delivered as commands, so neighbor links
//! can never be observed half-patched.
//!
//! ```text
//!   SessionHandle (Clone)      mpsc       session actor
//!   ┌──────────────────────┐  ──────▶  ┌─────────────────────────┐
//!   │ .on_event()          │           │ SessionState            │
//!   │ .set_preference()    │  ◀──────  │  timeline / roster      │
//!   │ .entries()           │  oneshot  │  spawn translations ──┐ │
//!   └──────────────────────┘           └───────────────────────┼─┘
//!                                         ▲ ApplyTranslation   │
//!                                         └────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use chatline_shared::{EntryId, RawEvent, UserProfile};
use chatline_store::{DisplayEntry, RoomState, StoreError};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::{emit, SessionNotification};
use crate::state::{Change, SessionState};
use crate::translate::{spawn_translation, Translator};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands processed by the session actor, in arrival order.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Event(RawEvent),
    Disconnected {
        reason: String,
        code: u16,
        at: DateTime<Utc>,
    },
    ApplyTranslation {
        id: EntryId,
        text: String,
    },
    SetPreference {
        sender_key: String,
        lang_code: Option<String>,
        reply: oneshot::Sender<Option<String>>,
    },
    Hide {
        id: EntryId,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Block {
        sender_key: String,
        reply: oneshot::Sender<bool>,
    },
    SetLikeCount(u32),
    RoomInfo(Value),
    Clear {
        reply: oneshot::Sender<()>,
    },
    Entries {
        visible_only: bool,
        reply: oneshot::Sender<Vec<DisplayEntry>>,
    },
    Roster {
        reply: oneshot::Sender<Vec<UserProfile>>,
    },
    Room {
        reply: oneshot::Sender<RoomState>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Entry point for starting a session.
pub struct Session;

impl Session {
    /// Spawn the session actor on the current tokio runtime.
    ///
    /// `translator` is optional; without one, preferences are stored but no
    /// entry is ever translated.
    pub fn spawn(
        config: &SessionConfig,
        local_user: UserProfile,
        room: RoomState,
        translator: Option<Arc<dyn Translator>>,
    ) -> SessionHandle {
        let session_id = Uuid::new_v4();
        let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(config.command_buffer);
        let (notify_tx, _) = broadcast::channel::<SessionNotification>(config.notify_buffer);

        info!(
            session = %session_id,
            room = %room.room_key,
            user = %local_user.client_key,
            translation = translator.is_some(),
            "Starting session"
        );

        let actor = SessionActor {
            state: SessionState::new(local_user, room),
            translator,
            self_tx: cmd_tx.downgrade(),
            notify_tx: notify_tx.clone(),
        };
        tokio::spawn(
            actor
                .run(cmd_rx)
                .instrument(info_span!("session", id = %session_id)),
        );

        SessionHandle {
            tx: cmd_tx,
            notify_tx,
        }
    }
}

struct SessionActor {
    state: SessionState,
    translator: Option<Arc<dyn Translator>>,
    /// Weak so that the actor does not keep its own queue open
    self_tx: mpsc::WeakSender<SessionCommand>,
    notify_tx: broadcast::Sender<SessionNotification>,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                SessionCommand::Event(raw) => {
                    let changes = self.state.handle_event(raw);
                    self.publish(changes);
                }

                SessionCommand::Disconnected { reason, code, at } => {
                    let changes = self.state.handle_disconnect(&reason, code, at);
                    self.publish(changes);
                    emit(&self.notify_tx, SessionNotification::Disconnected { reason, code });
                }

                SessionCommand::ApplyTranslation { id, text } => {
                    if self.state.timeline.apply_translation(id, text) {
                        debug!(entry = %id, "Translation applied");
                        self.emit_updated(id);
                    } else {
                        debug!(entry = %id, "Translated entry no longer present, discarding");
                    }
                }

                SessionCommand::SetPreference {
                    sender_key,
                    lang_code,
                    reply,
                } => {
                    info!(sender = %sender_key, lang = ?lang_code, "Translation preference changed");
                    let previous = self.state.preferences.set(&sender_key, lang_code);
                    let _ = reply.send(previous);
                }

                SessionCommand::Hide { id, reply } => {
                    let result = self.state.timeline.hide(id);
                    if result.is_ok() {
                        self.emit_updated(id);
                    }
                    let _ = reply.send(result);
                }

                SessionCommand::Block { sender_key, reply } => {
                    let added = self.state.timeline.block(sender_key.clone());
                    if added {
                        info!(sender = %sender_key, "Sender blocked until reconnect");
                        emit(&self.notify_tx, SessionNotification::SenderBlocked { sender_key });
                    }
                    let _ = reply.send(added);
                }

                SessionCommand::SetLikeCount(count) => {
                    if self.state.room.like_count != count {
                        self.state.room.like_count = count;
                        emit(
                            &self.notify_tx,
                            SessionNotification::RoomChanged {
                                room: self.state.room.clone(),
                            },
                        );
                    }
                }

                SessionCommand::RoomInfo(info) => {
                    self.state.room.apply_info(&info);
                    debug!(title = %self.state.room.title, "Room info applied");
                    emit(
                        &self.notify_tx,
                        SessionNotification::RoomChanged {
                            room: self.state.room.clone(),
                        },
                    );
                }

                SessionCommand::Clear { reply } => {
                    info!(entries = self.state.timeline.len(), "Clearing session");
                    self.state.clear();
                    emit(&self.notify_tx, SessionNotification::TimelineCleared);
                    let _ = reply.send(());
                }

                SessionCommand::Entries {
                    visible_only,
                    reply,
                } => {
                    let entries = if visible_only {
                        self.state.timeline.visible().cloned().collect()
                    } else {
                        self.state.timeline.snapshot()
                    };
                    let _ = reply.send(entries);
                }

                SessionCommand::Roster { reply } => {
                    let _ = reply.send(self.state.roster.to_vec());
                }

                SessionCommand::Room { reply } => {
                    let _ = reply.send(self.state.room.clone());
                }

                SessionCommand::Shutdown => {
                    info!("Session shutdown requested");
                    break;
                }
            }
        }

        info!("Session actor terminated");
    }

    fn publish(&self, changes: Vec<Change>) {
        for change in changes {
            match change {
                Change::Appended(entry) => {
                    self.schedule_translation(&entry);
                    emit(&self.notify_tx, SessionNotification::EntryAppended { entry });
                }
                Change::Prepended(entry) => {
                    emit(&self.notify_tx, SessionNotification::EntryPrepended { entry });
                }
                Change::NeighborPatched(id) => self.emit_updated(id),
                Change::RosterReplaced { count } => {
                    emit(&self.notify_tx, SessionNotification::RosterChanged { count });
                }
            }
        }
    }

    fn schedule_translation(&self, entry: &DisplayEntry) {
        let Some(translator) = &self.translator else {
            return;
        };
        if let Some(job) = self.state.translation_for(entry) {
            debug!(entry = %job.entry_id, lang = %job.target_lang, "Scheduling translation");
            spawn_translation(translator.clone(), job, self.self_tx.clone());
        }
    }

    fn emit_updated(&self, id: EntryId) {
        if let Some(entry) = self.state.timeline.get(id) {
            emit(
                &self.notify_tx,
                SessionNotification::EntryUpdated {
                    entry: entry.clone(),
                },
            );
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    notify_tx: broadcast::Sender<SessionNotification>,
}

impl SessionHandle {
    /// Subscribe to change notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.notify_tx.subscribe()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(cmd).await.map_err(|_| SessionError::Shutdown)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| SessionError::Shutdown)
    }

    // ── Channel input ────────────────────────────────────────────────────

    /// Deliver one channel event as `(address, body, timestamp)`.
    pub async fn on_event(
        &self,
        address: &str,
        body: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.deliver(RawEvent::decode(address, body, timestamp)).await
    }

    /// Deliver an already decoded event.
    pub async fn deliver(&self, raw: RawEvent) -> Result<(), SessionError> {
        self.send(SessionCommand::Event(raw)).await
    }

    /// Report that the channel dropped. Appends a notice; call
    /// [`clear`](Self::clear) afterwards to end the session.
    pub async fn on_disconnect(&self, reason: &str, code: u16) -> Result<(), SessionError> {
        self.send(SessionCommand::Disconnected {
            reason: reason.to_string(),
            code,
            at: Utc::now(),
        })
        .await
    }

    // ── User actions ─────────────────────────────────────────────────────

    /// Set (`Some`) or remove (`None`) the translation target for a sender.
    /// Applies to entries appended afterwards. Returns the previous target.
    pub async fn set_preference(
        &self,
        sender_key: &str,
        lang_code: Option<&str>,
    ) -> Result<Option<String>, SessionError> {
        let sender_key = sender_key.to_string();
        let lang_code = lang_code.map(str::to_string);
        self.request(|reply| SessionCommand::SetPreference {
            sender_key,
            lang_code,
            reply,
        })
        .await
    }

    pub async fn hide(&self, id: EntryId) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Hide { id, reply })
            .await?
            .map_err(SessionError::from)
    }

    /// Hide everything from `sender_key` until the session is cleared.
    pub async fn block(&self, sender_key: &str) -> Result<bool, SessionError> {
        let sender_key = sender_key.to_string();
        self.request(|reply| SessionCommand::Block { sender_key, reply })
            .await
    }

    pub async fn set_like_count(&self, count: u32) -> Result<(), SessionError> {
        self.send(SessionCommand::SetLikeCount(count)).await
    }

    /// Merge room details fetched out of band (title, type, lock, cap).
    pub async fn set_room_info(&self, info: Value) -> Result<(), SessionError> {
        self.send(SessionCommand::RoomInfo(info)).await
    }

    /// Empty the timeline and roster. Used on disconnect.
    pub async fn clear(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Clear { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Every entry in display order, hidden ones included.
    pub async fn entries(&self) -> Result<Vec<DisplayEntry>, SessionError> {
        self.request(|reply| SessionCommand::Entries {
            visible_only: false,
            reply,
        })
        .await
    }

    /// Entries to render: hidden and blocked ones removed.
    pub async fn visible_entries(&self) -> Result<Vec<DisplayEntry>, SessionError> {
        self.request(|reply| SessionCommand::Entries {
            visible_only: true,
            reply,
        })
        .await
    }

    pub async fn roster(&self) -> Result<Vec<UserProfile>, SessionError> {
        self.request(|reply| SessionCommand::Roster { reply }).await
    }

    pub async fn room(&self) -> Result<RoomState, SessionError> {
        self.request(|reply| SessionCommand::Room { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chatline_shared::error::TranslateError;
    use futures::future::BoxFuture;
    use serde_json::json;
    use tokio::sync::Semaphore;

    use crate::translate::TranslationJob;

    /// Answers every request with `"<lang>:<text>"`.
    struct TaggingTranslator;

    impl Translator for TaggingTranslator {
        fn translate(&self, job: &TranslationJob) -> BoxFuture<'static, Result<Option<String>, TranslateError>> {
            let text = format!("{}:{}", job.target_lang, job.text);
            Box::pin(async move { Ok(Some(text)) })
        }
    }

    /// Holds each translation until a permit is released on the gate.
    struct GatedTranslator {
        gate: Arc<Semaphore>,
    }

    impl Translator for GatedTranslator {
        fn translate(&self, job: &TranslationJob) -> BoxFuture<'static, Result<Option<String>, TranslateError>> {
            let gate = self.gate.clone();
            let text = format!("late:{}", job.text);
            Box::pin(async move {
                let _permit = gate.acquire_owned().await;
                Ok(Some(text))
            })
        }
    }

    struct FailingTranslator;

    impl Translator for FailingTranslator {
        fn translate(&self, _job: &TranslationJob) -> BoxFuture<'static, Result<Option<String>, TranslateError>> {
            Box::pin(async { Err(TranslateError::Status(503)) })
        }
    }

    fn spawn(translator: Option<Arc<dyn Translator>>) -> SessionHandle {
        Session::spawn(
            &SessionConfig::default(),
            UserProfile::new("me-nick", "me"),
            RoomState::new("room-1", "Lobby"),
            translator,
        )
    }

    async fn say(handle: &SessionHandle, key: &str, text: &str) {
        handle
            .on_event(
                "notifyMessage",
                &json!({ "clientKey": key, "nickName": key, "message": text }),
                Utc::now(),
            )
            .await
            .unwrap();
    }

    async fn wait_translated(handle: &SessionHandle, count: usize) -> Vec<DisplayEntry> {
        for _ in 0..100 {
            let entries = handle.entries().await.unwrap();
            if entries.iter().filter(|e| e.is_translated).count() >= count {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.entries().await.unwrap()
    }

    #[tokio::test]
    async fn test_translation_applies_only_to_opted_in_sender() {
        let handle = spawn(Some(Arc::new(TaggingTranslator)));
        handle.set_preference("a", Some("en")).await.unwrap();

        say(&handle, "a", "hola").await;
        say(&handle, "b", "salut").await;

        let entries = wait_translated(&handle, 1).await;
        assert_eq!(entries[0].message, "en:hola");
        assert!(entries[0].is_translated);
        assert_eq!(entries[1].message, "salut");
        assert!(!entries[1].is_translated);
    }

    #[tokio::test]
    async fn test_translation_after_clear_is_discarded() {
        let gate = Arc::new(Semaphore::new(0));
        let handle = spawn(Some(Arc::new(GatedTranslator { gate: gate.clone() })));
        handle.set_preference("a", Some("en")).await.unwrap();

        say(&handle, "a", "hola").await;
        handle.clear().await.unwrap();
        say(&handle, "a", "again").await;

        gate.add_permits(2);
        let entries = wait_translated(&handle, 1).await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "late:again");
    }

    #[tokio::test]
    async fn test_failed_translation_leaves_entry_untouched() {
        let handle = spawn(Some(Arc::new(FailingTranslator)));
        handle.set_preference("a", Some("en")).await.unwrap();
        say(&handle, "a", "hola").await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        let entries = handle.entries().await.unwrap();
        assert_eq!(entries[0].message, "hola");
        assert!(!entries[0].is_translated);
    }

    #[tokio::test]
    async fn test_notifications_follow_mutations() {
        let handle = spawn(None);
        let mut rx = handle.subscribe();

        say(&handle, "a", "hi").await;
        handle
            .on_event(
                "clientList",
                &json!({ "clientlist": [{ "nickName": "a", "clientKey": "a", "grade": "user" }] }),
                Utc::now(),
            )
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            SessionNotification::EntryAppended { entry } => assert_eq!(entry.message, "hi"),
            other => panic!("unexpected notification: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            SessionNotification::RosterChanged { count } => assert_eq!(count, 1),
            other => panic!("unexpected notification: {other:?}"),
        }
        assert_eq!(handle.room().await.unwrap().member_count, 1);
        assert_eq!(handle.roster().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_hide_block_and_visibility() {
        let handle = spawn(None);
        say(&handle, "a", "one").await;
        say(&handle, "b", "two").await;
        say(&handle, "c", "three").await;

        let entries = handle.entries().await.unwrap();
        handle.hide(entries[0].id).await.unwrap();
        assert!(handle.block("b").await.unwrap());

        let visible = handle.visible_entries().await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "three");
        assert_eq!(handle.entries().await.unwrap().len(), 3);

        assert_eq!(
            handle.hide(EntryId(4242)).await,
            Err(SessionError::Store(StoreError::EntryNotFound(EntryId(4242))))
        );
    }

    #[tokio::test]
    async fn test_disconnect_then_clear() {
        let handle = spawn(None);
        let mut rx = handle.subscribe();
        say(&handle, "a", "hi").await;
        handle.on_disconnect("server closed", 1006).await.unwrap();

        let entries = handle.entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].sender_key, "");

        handle.clear().await.unwrap();
        assert!(handle.entries().await.unwrap().is_empty());

        let mut saw_disconnect = false;
        while let Ok(notification) = rx.try_recv() {
            if matches!(notification, SessionNotification::Disconnected { code: 1006, .. }) {
                saw_disconnect = true;
            }
        }
        assert!(saw_disconnect);
    }

    #[tokio::test]
    async fn test_like_count() {
        let handle = spawn(None);
        let mut rx = handle.subscribe();
        handle.set_like_count(12).await.unwrap();
        handle.set_like_count(12).await.unwrap();
        assert_eq!(handle.room().await.unwrap().like_count_label(), "012");

        match rx.try_recv() {
            Ok(SessionNotification::RoomChanged { room }) => assert_eq!(room.like_count, 12),
            other => panic!("unexpected notification: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_room_info_is_applied_and_notified() {
        let handle = spawn(None);
        let mut rx = handle.subscribe();
        handle
            .set_room_info(json!({ "title": "Garden", "roomType": "01", "userMax": 10 }))
            .await
            .unwrap();

        let room = handle.room().await.unwrap();
        assert_eq!(room.title, "Garden");
        assert_eq!(room.user_max, 10);
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionNotification::RoomChanged { room }) if room.room_type == "01"
        ));
    }

    /// Mirror of a UI list driven only by notifications.
    fn apply_to_view(view: &mut Vec<DisplayEntry>, notification: SessionNotification) {
        match notification {
            SessionNotification::EntryAppended { entry } => view.push(entry),
            SessionNotification::EntryPrepended { entry } => view.insert(0, entry),
            SessionNotification::EntryUpdated { entry } => {
                if let Some(slot) = view.iter_mut().find(|e| e.id == entry.id) {
                    *slot = entry;
                }
            }
            SessionNotification::TimelineCleared => view.clear(),
            _ => {}
        }
    }

    #[tokio::test]
    async fn test_notified_view_matches_store() {
        let handle = spawn(None);
        let mut rx = handle.subscribe();

        say(&handle, "a", "one").await;
        say(&handle, "a", "two").await;
        handle
            .on_event(
                "joinUserInit",
                &json!({ "history": [
                    { "clientKey": "a", "message": "h1" },
                    { "clientKey": "b", "message": "h2" },
                ]}),
                Utc::now(),
            )
            .await
            .unwrap();
        say(&handle, "b", "three").await;

        let stored = handle.entries().await.unwrap();
        let mut view = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            apply_to_view(&mut view, notification);
        }

        assert_eq!(view, stored);
        let flags: Vec<_> = view.iter().map(|e| e.show_timestamp()).collect();
        let expected: Vec<_> = stored.iter().map(|e| e.show_timestamp()).collect();
        assert_eq!(flags, expected);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_commands() {
        let handle = spawn(None);
        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.entries().await, Err(SessionError::Shutdown));
    }
}
