//! Maps each inbound event kind to the timeline operation it triggers.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use chatline_shared::constants::{
    notice_kicked, notice_muted, notice_unkicked, notice_unmuted, NOTICE_DISCONNECTED,
    NOTICE_PERSONAL_DUPLICATE, NOTICE_PERSONAL_KICK, NOTICE_PERSONAL_MUTE,
    NOTICE_PERSONAL_UNMUTE,
};
use chatline_shared::{EventBody, EventKind, ModerationTarget, RawEvent, UserProfile};

/// What the session should do with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Prepend each item in the given order. Items are already newest
    /// first, so the timeline ends up oldest at the top.
    PrependHistory(Vec<RawEvent>),
    /// Replace the roster; the timeline is untouched.
    ReplaceRoster(Vec<UserProfile>),
    AppendLive(RawEvent),
    Ignore,
}

pub fn route_event(raw: RawEvent, local_user_key: &str) -> Route {
    debug!(kind = ?raw.kind, "Routing event");

    match raw.kind {
        EventKind::JoinUserInit => match raw.body {
            EventBody::History(mut items) => {
                items.reverse();
                Route::PrependHistory(items)
            }
            _ => Route::Ignore,
        },

        EventKind::ClientList => match raw.body {
            EventBody::ClientList(members) => Route::ReplaceRoster(members),
            _ => Route::Ignore,
        },

        EventKind::Message
        | EventKind::Whisper
        | EventKind::Notice
        | EventKind::Custom
        | EventKind::JoinUser
        | EventKind::LeaveUser
        | EventKind::SendWhisper
        | EventKind::Unknown => Route::AppendLive(raw),

        EventKind::PersonalKickUser => notice(NOTICE_PERSONAL_KICK, raw.timestamp),
        EventKind::PersonalMuteUser => notice(NOTICE_PERSONAL_MUTE, raw.timestamp),
        EventKind::PersonalUnmuteUser => notice(NOTICE_PERSONAL_UNMUTE, raw.timestamp),
        EventKind::PersonalDuplicateUser => notice(NOTICE_PERSONAL_DUPLICATE, raw.timestamp),

        EventKind::PersonalInvite => {
            if let EventBody::Invite { room_id } = &raw.body {
                info!(room = ?room_id, "Invited to another room; invitations are not supported");
            }
            Route::Ignore
        }

        EventKind::KickUser | EventKind::UnkickUser | EventKind::MuteUser | EventKind::UnmuteUser => {
            let EventBody::Moderation(target) = &raw.body else {
                return Route::Ignore;
            };
            match broadcast_notice(raw.kind, target, local_user_key) {
                Some(message) => notice(&message, raw.timestamp),
                None => Route::Ignore,
            }
        }
    }
}

/// Notice appended when the channel drops the connection.
pub fn disconnect_notice(reason: &str, code: u16, timestamp: DateTime<Utc>) -> Route {
    info!(reason, code, "Channel disconnected");
    notice(NOTICE_DISCONNECTED, timestamp)
}

fn notice(message: &str, timestamp: DateTime<Utc>) -> Route {
    Route::AppendLive(RawEvent::notice(message, timestamp))
}

/// Broadcast moderation naming the local user is dropped: the personal
/// signal for the same action already produced a notice.
fn broadcast_notice(kind: EventKind, target: &ModerationTarget, local_user_key: &str) -> Option<String> {
    let nickname = target.nickname.as_deref()?;

    let names_local_user = !local_user_key.is_empty()
        && target.client_key.as_deref() == Some(local_user_key);
    if names_local_user {
        debug!(kind = ?kind, "Suppressing broadcast moderation notice for local user");
        return None;
    }

    match kind {
        EventKind::KickUser => Some(notice_kicked(nickname)),
        EventKind::UnkickUser => Some(notice_unkicked(nickname)),
        EventKind::MuteUser => Some(notice_muted(nickname)),
        EventKind::UnmuteUser => Some(notice_unmuted(nickname)),
        _ => None,
    }
}
