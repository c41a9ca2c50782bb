//! Translation enrichment.
//!
//! A freshly appended text entry whose sender has a translation target is
//! sent to a [`Translator`] in a detached task. The result is not written to
//! the timeline from that task: it is posted back to the session queue as a
//! command so the rewrite is serialized with every other mutation.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use chatline_shared::error::TranslateError;
use chatline_shared::{EntryId, MimeKind};
use chatline_store::{DisplayEntry, TranslationPreferences};

use crate::session::SessionCommand;

/// One pending translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub entry_id: EntryId,
    pub text: String,
    pub target_lang: String,
    pub room_key: String,
}

/// External translation service.
///
/// `Ok(None)` means the service answered without a translation.
pub trait Translator: Send + Sync + 'static {
    fn translate(&self, job: &TranslationJob) -> BoxFuture<'static, Result<Option<String>, TranslateError>>;
}

/// Decide whether `entry` should be translated. Only text entries whose
/// sender has a target language qualify.
pub fn plan_translation(
    entry: &DisplayEntry,
    preferences: &TranslationPreferences,
    room_key: &str,
) -> Option<TranslationJob> {
    if entry.mime != MimeKind::Text {
        return None;
    }
    let target = preferences.target_for(&entry.sender_key)?;

    Some(TranslationJob {
        entry_id: entry.id,
        text: entry.message.clone(),
        target_lang: target.to_string(),
        room_key: room_key.to_string(),
    })
}

/// Run `job` in the background and post the result to the session.
///
/// Only a weak sender is held, so an in-flight translation does not keep a
/// shut-down session alive. Failures and empty results are logged and
/// dropped; the entry stays untranslated.
pub(crate) fn spawn_translation(
    translator: Arc<dyn Translator>,
    job: TranslationJob,
    session_tx: mpsc::WeakSender<SessionCommand>,
) {
    tokio::spawn(async move {
        let id = job.entry_id;
        match translator.translate(&job).await {
            Ok(Some(text)) => {
                let Some(tx) = session_tx.upgrade() else {
                    debug!(entry = %id, "Session gone, discarding translation");
                    return;
                };
                if tx.send(SessionCommand::ApplyTranslation { id, text }).await.is_err() {
                    debug!(entry = %id, "Session closed before translation was applied");
                }
            }
            Ok(None) => {
                debug!(entry = %id, lang = %job.target_lang, "Translator returned no text");
            }
            Err(e) => {
                warn!(entry = %id, lang = %job.target_lang, error = %e, "Translation failed");
            }
        }
    });
}

// ---------------------------------------------------------------------------
// HTTP translator
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language_code: &'a str,
    room_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: Option<String>,
}

/// Translator backed by a JSON HTTP endpoint.
///
/// Posts `{ text, targetLanguageCode, roomId }` and reads `{ data }`.
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTranslator {
    /// Fails with [`TranslateError::Disabled`] when `endpoint` is blank.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TranslateError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(TranslateError::Disabled);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslateError::Request(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, job: &TranslationJob) -> BoxFuture<'static, Result<Option<String>, TranslateError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let job = job.clone();

        Box::pin(async move {
            let resp = client
                .post(&endpoint)
                .json(&TranslateRequest {
                    text: &job.text,
                    target_language_code: &job.target_lang,
                    room_id: &job.room_key,
                })
                .send()
                .await
                .map_err(|e| TranslateError::Request(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(TranslateError::Status(resp.status().as_u16()));
            }

            let body: TranslateResponse = resp
                .json()
                .await
                .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;

            Ok(body.data)
        })
    }
}
