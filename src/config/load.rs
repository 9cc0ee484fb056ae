use std::{env, path::PathBuf};

use crate::error::{Error, Result};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` layers struct defaults, an optional config file and
/// environment variables (prefix `BOOKEND__`), in increasing precedence.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("BOOKEND")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("library.extensions")
                .with_list_parse_key("library.cover_names")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<()> {
        if self.playback.progress_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "playback.progress_interval_secs must be >= 1".to_string(),
            ));
        }
        if self.audio.position_update_ms == 0 {
            return Err(Error::InvalidConfig(
                "audio.position_update_ms must be >= 1".to_string(),
            ));
        }
        let has_extension = self
            .library
            .extensions
            .iter()
            .any(|e| !e.trim().trim_start_matches('.').is_empty());
        if !has_extension {
            return Err(Error::InvalidConfig(
                "library.extensions must name at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    /// Progress file location: explicit setting, then `BOOKEND_PROGRESS_PATH`,
    /// then the XDG data directory.
    pub fn progress_path(&self) -> Option<PathBuf> {
        if let Some(p) = &self.store.progress_path {
            return Some(p.clone());
        }
        if let Some(p) = env::var_os("BOOKEND_PROGRESS_PATH") {
            return Some(PathBuf::from(p));
        }
        xdg_dir("XDG_DATA_HOME", &[".local", "share"]).map(|d| d.join("progress.toml"))
    }

    /// Log file location: explicit setting, then the XDG state directory.
    pub fn log_path(&self) -> Option<PathBuf> {
        if let Some(p) = &self.logging.file {
            return Some(p.clone());
        }
        xdg_dir("XDG_STATE_HOME", &[".local", "state"]).map(|d| d.join("bookend.log"))
    }
}

/// Resolve the config path from `BOOKEND_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("BOOKEND_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/bookend/config.toml`
/// or `~/.config/bookend/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", &[".config"]).map(|d| d.join("config.toml"))
}

/// `$<var>/bookend`, or `$HOME/<fallback...>/bookend` when `var` is unset.
fn xdg_dir(var: &str, home_fallback: &[&str]) -> Option<PathBuf> {
    let base = if let Some(dir) = env::var_os(var) {
        Some(PathBuf::from(dir))
    } else if let Some(home) = env::var_os("HOME") {
        let mut p = PathBuf::from(home);
        for part in home_fallback {
            p.push(part);
        }
        Some(p)
    } else {
        None
    };

    base.map(|d| d.join("bookend"))
}
