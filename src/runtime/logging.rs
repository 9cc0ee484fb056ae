use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Settings;
use crate::error::Result;

/// Send `tracing` output to the log file; the terminal belongs to the UI.
///
/// `RUST_LOG` wins over `logging.level`. Without a usable log location
/// nothing is installed and events are dropped.
pub fn init(settings: &Settings) -> Result<()> {
    let Some(path) = settings.log_path() else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
    Ok(())
}
