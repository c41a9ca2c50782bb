use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable handle of a timeline entry.
///
/// Ids are allocated from a monotonically increasing counter and are never
/// reused, not even after the timeline has been cleared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A chat participant as reported by the channel.
///
/// Used both for the local user (provided once at session start) and for
/// roster members decoded from client-list snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "nickName")]
    pub nickname: String,
    pub client_key: String,
    pub grade: String,
    #[serde(default)]
    pub user_info: Map<String, Value>,
}

impl UserProfile {
    pub fn new(nickname: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            client_key: client_key.into(),
            grade: "user".to_string(),
            user_info: Map::new(),
        }
    }

    /// Decode one client-list member.
    ///
    /// `nickName`, `clientKey` and `grade` are required; `userInfo` falls back
    /// to an empty object when missing or not an object.
    pub fn from_member(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let nickname = obj.get("nickName")?.as_str()?;
        let client_key = obj.get("clientKey")?.as_str()?;
        let grade = obj.get("grade")?.as_str()?;
        let user_info = obj
            .get("userInfo")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        Some(Self {
            nickname: nickname.to_string(),
            client_key: client_key.to_string(),
            grade: grade.to_string(),
            user_info,
        })
    }

    /// Avatar index stored under `userInfo.profile`, `"1"` when absent.
    pub fn profile_image(&self) -> &str {
        self.user_info
            .get("profile")
            .and_then(Value::as_str)
            .unwrap_or("1")
    }
}
