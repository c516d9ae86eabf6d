use anyhow::Result;
use std::fs::{self, File};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// The terminal owns the screen while the console runs, so log lines go to
/// a file under the config directory instead of stderr. Filtered through
/// RUST_LOG, info by default.
pub fn init() -> Result<()> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(());
    };

    let dir = config_dir.join("farmchat");
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("farmchat.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
