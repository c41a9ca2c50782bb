//! # chatline-replay
//!
//! Feeds a recorded channel transcript through a room session and prints
//! the resulting timeline. Useful for checking grouping and notice rules
//! against captured traffic.
//!
//! ```text
//! chatline-replay <script.jsonl>
//! chatline-replay < script.jsonl
//! ```

mod render;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use chatline_client::{HttpTranslator, Session, SessionConfig, SessionHandle, Translator};
use chatline_shared::UserProfile;
use chatline_store::RoomState;

use crate::replay::Step;

/// Grace period for in-flight translations before the snapshot is taken.
const TRANSLATION_SETTLE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatline_client::init_tracing("info,chatline_client=debug");
    info!("Starting chatline-replay v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::from_env();
    info!(?config, "Loaded configuration");

    let steps = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => replay::load_script(&path, Utc::now()).await?,
        None => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("reading stdin")?;
            replay::parse_script(&input, Utc::now())
        }
    };
    info!(steps = steps.len(), "Loaded script");

    let translator: Option<Arc<dyn Translator>> = match &config.translate_url {
        Some(url) => Some(Arc::new(HttpTranslator::new(url.clone(), config.translate_timeout)?)),
        None => None,
    };
    let has_translator = translator.is_some();

    let local_user = UserProfile::new(config.local_nickname.clone(), config.local_key.clone());
    let room = RoomState::new(config.room_key.clone(), "");
    let handle = Session::spawn(&config, local_user, room, translator);

    for step in steps {
        run_step(&handle, step).await?;
    }

    if has_translator {
        tokio::time::sleep(TRANSLATION_SETTLE).await;
    }

    let entries = handle.visible_entries().await?;
    for line in render::render_timeline(&entries) {
        println!("{line}");
    }
    println!("{}", render::render_room(&handle.room().await?));

    handle.shutdown().await?;
    Ok(())
}

async fn run_step(handle: &SessionHandle, step: Step) -> anyhow::Result<()> {
    match step {
        Step::Event(raw) => handle.deliver(raw).await?,
        Step::Translate { client_key, lang } => {
            handle.set_preference(&client_key, lang.as_deref()).await?;
        }
        Step::Block(key) => {
            if !handle.block(&key).await? {
                warn!(sender = %key, "Sender already blocked or empty key");
            }
        }
        Step::Likes(count) => handle.set_like_count(count).await?,
        Step::RoomInfo(info) => handle.set_room_info(info).await?,
        Step::Disconnect { reason, code } => handle.on_disconnect(&reason, code).await?,
    }
    Ok(())
}
