use crate::config;
use crate::error::Error;

/// Load and validate settings, falling back to defaults.
///
/// The failure is handed back instead of logged because logging itself is
/// configured from these settings.
pub fn load_settings() -> (config::Settings, Option<Error>) {
    match config::Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(e) => (config::Settings::default(), Some(e)),
        },
        Err(e) => (config::Settings::default(), Some(e)),
    }
}
