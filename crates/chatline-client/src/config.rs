//! Session configuration loaded from environment variables.
//!
//! Every setting has a default so a session can start with zero
//! configuration.

use std::time::Duration;

use chatline_shared::constants::{
    DEFAULT_COMMAND_BUFFER, DEFAULT_NOTIFY_BUFFER, DEFAULT_TRANSLATE_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the actor command queue.
    /// Env: `CHATLINE_COMMAND_BUFFER`
    pub command_buffer: usize,

    /// Capacity of the notification broadcast channel. Slow subscribers
    /// past this many notifications observe a lag.
    /// Env: `CHATLINE_NOTIFY_BUFFER`
    pub notify_buffer: usize,

    /// Translation endpoint. `None` disables the HTTP translator.
    /// Env: `CHATLINE_TRANSLATE_URL`
    pub translate_url: Option<String>,

    /// Request timeout for the HTTP translator.
    /// Env: `CHATLINE_TRANSLATE_TIMEOUT_SECS`
    pub translate_timeout: Duration,

    /// Local user identity.
    /// Env: `CHATLINE_LOCAL_KEY`, `CHATLINE_LOCAL_NICKNAME`
    pub local_key: String,
    pub local_nickname: String,

    /// Room the session is bound to.
    /// Env: `CHATLINE_ROOM_KEY`
    pub room_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_buffer: DEFAULT_COMMAND_BUFFER,
            notify_buffer: DEFAULT_NOTIFY_BUFFER,
            translate_url: None,
            translate_timeout: Duration::from_secs(DEFAULT_TRANSLATE_TIMEOUT_SECS),
            local_key: String::new(),
            local_nickname: String::new(),
            room_key: String::new(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(n) = parse_positive(&lookup, "CHATLINE_COMMAND_BUFFER") {
            config.command_buffer = n;
        }

        if let Some(n) = parse_positive(&lookup, "CHATLINE_NOTIFY_BUFFER") {
            config.notify_buffer = n;
        }

        if let Some(url) = lookup("CHATLINE_TRANSLATE_URL") {
            if !url.trim().is_empty() {
                config.translate_url = Some(url.trim().to_string());
            }
        }

        if let Some(secs) = parse_positive(&lookup, "CHATLINE_TRANSLATE_TIMEOUT_SECS") {
            config.translate_timeout = Duration::from_secs(secs as u64);
        }

        if let Some(key) = lookup("CHATLINE_LOCAL_KEY") {
            config.local_key = key;
        }

        if let Some(nickname) = lookup("CHATLINE_LOCAL_NICKNAME") {
            config.local_nickname = nickname;
        }

        if let Some(room) = lookup("CHATLINE_ROOM_KEY") {
            config.room_key = room;
        }

        config
    }
}

/// Channel capacities must be non-zero; anything else keeps the default.
fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let value = lookup(key)?;
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %value, "Invalid value, using default");
            None
        }
    }
}
