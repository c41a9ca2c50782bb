//! Replay scripts.
//!
//! A script is JSON Lines. Most lines are channel envelopes
//! (`{"address", "body", "messageDt"?}`); a few control lines drive user
//! actions between events:
//!
//! ```text
//! {"translate": {"clientKey": "a", "lang": "en"}}   lang null removes
//! {"block": "a"}
//! {"likes": 12}
//! {"roomInfo": {"title": "Lobby", "roomType": "01", "lockType": "", "userMax": 10}}
//! {"disconnect": {"reason": "server closed", "code": 1000}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Lines that are not
//! valid JSON are logged and skipped.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use chatline_shared::RawEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Event(RawEvent),
    Translate { client_key: String, lang: Option<String> },
    Block(String),
    Likes(u32),
    RoomInfo(Value),
    Disconnect { reason: String, code: u16 },
}

impl Step {
    fn from_value(value: &Value, fallback: DateTime<Utc>) -> Self {
        if let Some(t) = value.get("translate") {
            return Step::Translate {
                client_key: str_field(t, "clientKey"),
                lang: t.get("lang").and_then(Value::as_str).map(str::to_string),
            };
        }
        if let Some(key) = value.get("block").and_then(Value::as_str) {
            return Step::Block(key.to_string());
        }
        if let Some(n) = value.get("likes").and_then(Value::as_u64) {
            return Step::Likes(u32::try_from(n).unwrap_or(u32::MAX));
        }
        if let Some(info) = value.get("roomInfo") {
            return Step::RoomInfo(info.clone());
        }
        if let Some(d) = value.get("disconnect") {
            return Step::Disconnect {
                reason: str_field(d, "reason"),
                code: d
                    .get("code")
                    .and_then(Value::as_u64)
                    .and_then(|c| u16::try_from(c).ok())
                    .unwrap_or(1000),
            };
        }
        Step::Event(RawEvent::from_envelope(value, fallback))
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse a whole script. Envelopes without a `messageDt` get `fallback`.
pub fn parse_script(input: &str, fallback: DateTime<Utc>) -> Vec<Step> {
    input
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => Some(Step::from_value(&value, fallback)),
                Err(e) => {
                    warn!(line = i + 1, error = %e, "Skipping malformed script line");
                    None
                }
            }
        })
        .collect()
}

pub async fn load_script(path: &Path, fallback: DateTime<Utc>) -> anyhow::Result<Vec<Step>> {
    let input = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_script(&input, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_shared::EventKind;
    use std::io::Write;

    #[test]
    fn test_parse_mixed_script() {
        let script = r#"
# warm-up
{"address": "notifyMessage", "body": {"clientKey": "a", "nickName": "ann", "message": "hi"}}
{"translate": {"clientKey": "a", "lang": "en"}}
not json
{"block": "b"}
{"likes": 7}
{"roomInfo": {"title": "Lobby", "userMax": 10}}
{"disconnect": {"reason": "closed", "code": 4001}}
"#;
        let steps = parse_script(script, Utc::now());
        assert_eq!(steps.len(), 6);

        let Step::Event(raw) = &steps[0] else {
            panic!("expected event");
        };
        assert_eq!(raw.kind, EventKind::Message);
        assert_eq!(raw.chat_payload().unwrap().message, "hi");

        assert_eq!(
            steps[1],
            Step::Translate {
                client_key: "a".into(),
                lang: Some("en".into())
            }
        );
        assert_eq!(steps[2], Step::Block("b".into()));
        assert_eq!(steps[3], Step::Likes(7));
        assert_eq!(
            steps[4],
            Step::RoomInfo(serde_json::json!({ "title": "Lobby", "userMax": 10 }))
        );
        assert_eq!(
            steps[5],
            Step::Disconnect {
                reason: "closed".into(),
                code: 4001
            }
        );
    }

    #[test]
    fn test_translate_null_lang_removes() {
        let steps = parse_script(r#"{"translate": {"clientKey": "a", "lang": null}}"#, Utc::now());
        assert_eq!(
            steps,
            vec![Step::Translate {
                client_key: "a".into(),
                lang: None
            }]
        );
    }

    #[tokio::test]
    async fn test_load_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"address": "join", "body": {{"nickName": "ann"}}}}"#).unwrap();
        writeln!(file, r#"{{"address": "leave", "body": {{"nickName": "ann"}}}}"#).unwrap();

        let steps = load_script(file.path(), Utc::now()).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(&steps[0], Step::Event(raw) if raw.kind == EventKind::JoinUser));
    }

    #[tokio::test]
    async fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(&dir.path().join("missing.jsonl"), Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing.jsonl"));
    }
}
