use thiserror::Error;

/// Failures reported by a translation backend.
///
/// These never reach the timeline: a failed translation leaves the entry
/// untouched.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Translation request failed: {0}")]
    Request(String),

    #[error("Translation service responded with status {0}")]
    Status(u16),

    #[error("Invalid translation response: {0}")]
    InvalidResponse(String),

    #[error("Translation is disabled")]
    Disabled,
}
