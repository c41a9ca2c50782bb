//! Per-peer translation opt-in.

use std::collections::HashMap;

use tracing::debug;

use chatline_shared::constants::language_name;

/// Maps a sender key to the language its messages are translated into.
/// Senders without a mapping are never translated.
#[derive(Debug, Clone, Default)]
pub struct TranslationPreferences {
    targets: HashMap<String, String>,
}

impl TranslationPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear (`None`) the target language for one sender.
    /// Returns the previous target. Empty sender keys are ignored.
    pub fn set(&mut self, sender_key: &str, lang_code: Option<String>) -> Option<String> {
        if sender_key.is_empty() {
            debug!("Ignoring translation preference for an empty sender key");
            return None;
        }
        match lang_code {
            Some(code) => self.targets.insert(sender_key.to_string(), code),
            None => self.targets.remove(sender_key),
        }
    }

    pub fn target_for(&self, sender_key: &str) -> Option<&str> {
        self.targets.get(sender_key).map(String::as_str)
    }

    /// Display name of the sender's target language, or `"Off"`.
    pub fn label_for(&self, sender_key: &str) -> &str {
        self.target_for(sender_key)
            .map(|code| language_name(code).unwrap_or(code))
            .unwrap_or("Off")
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
