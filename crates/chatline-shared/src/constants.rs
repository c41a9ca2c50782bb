/// Nickname attached to locally synthesized notices
pub const SYSTEM_NICKNAME: &str = "System";

/// Notices for moderation signals addressed to the local user
pub const NOTICE_PERSONAL_KICK: &str = "You have been removed from the room.";
pub const NOTICE_PERSONAL_MUTE: &str = "You have been muted.";
pub const NOTICE_PERSONAL_UNMUTE: &str = "You are no longer muted.";
pub const NOTICE_PERSONAL_DUPLICATE: &str = "You signed in from another device.";

/// Notice appended when the channel reports a disconnect
pub const NOTICE_DISCONNECTED: &str = "Disconnected from the server.";

/// Notices for broadcast moderation signals naming another user
pub fn notice_kicked(nickname: &str) -> String {
    format!("{nickname} was removed from the room.")
}

pub fn notice_unkicked(nickname: &str) -> String {
    format!("{nickname} may rejoin the room.")
}

pub fn notice_muted(nickname: &str) -> String {
    format!("{nickname} has been muted.")
}

pub fn notice_unmuted(nickname: &str) -> String {
    format!("{nickname} is no longer muted.")
}

/// Target languages offered for per-peer translation (code, display name)
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("ko", "Korean"),
    ("en", "English"),
    ("ja", "Japanese"),
    ("zh-CN", "Chinese (Simplified)"),
    ("zh-TW", "Chinese (Traditional)"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ru", "Russian"),
    ("vi", "Vietnamese"),
    ("th", "Thai"),
    ("id", "Indonesian"),
];

/// Display name for a translation target, if supported
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// File extensions previewed as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "heic"];

/// File extensions previewed as videos
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "wmv", "mkv", "webm"];

/// Default capacity of the session command queue
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Default capacity of the session notification broadcast
pub const DEFAULT_NOTIFY_BUFFER: usize = 256;

/// Default HTTP timeout for the translation endpoint, in seconds
pub const DEFAULT_TRANSLATE_TIMEOUT_SECS: u64 = 10;
