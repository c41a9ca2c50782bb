//! # chatline-client
//!
//! Room session runtime: routes channel events into the timeline, runs
//! translation enrichment, and publishes change notifications. All state is
//! owned by a single actor task reached through a [`SessionHandle`].

pub mod config;
pub mod dispatch;
pub mod events;
pub mod session;
pub mod state;
pub mod translate;

mod error;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::SessionConfig;
pub use error::SessionError;
pub use events::SessionNotification;
pub use session::{Session, SessionHandle};
pub use translate::{HttpTranslator, TranslationJob, Translator};

/// Install a global `tracing` subscriber. `RUST_LOG` takes precedence over
/// `default_filter`. Meant for binaries embedding the client; calling it
/// twice is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
