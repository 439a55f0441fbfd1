use std::ffi::OsString;
use std::path::{Path, PathBuf};

use time::Date;

use crate::error::SessionStoreError;

pub const APP_DIR_NAME: &str = "dotchat";
pub const APP_HOME_ENV: &str = "DOTCHAT_HOME";
pub const SESSIONS_DIR: &str = "sessions";
pub const HISTORY_FILE_NAME: &str = ".dotchat-history";

/// Per-user application directory: `$DOTCHAT_HOME`, else `<config dir>/dotchat`.
pub fn app_dir() -> Result<PathBuf, SessionStoreError> {
    app_dir_from(std::env::var_os(APP_HOME_ENV), dirs::config_dir())
}

/// [`app_dir`] with its inputs supplied by the caller.
pub fn app_dir_from(
    home_override: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, SessionStoreError> {
    if let Some(home) = home_override.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    config_dir
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(SessionStoreError::NoAppDir)
}

/// `<app_dir>/sessions/<YYYY-MM-DD>`.
#[must_use]
pub fn default_session_dir(app_dir: &Path, date: Date) -> PathBuf {
    app_dir.join(SESSIONS_DIR).join(format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    ))
}

#[must_use]
pub fn default_history_file(app_dir: &Path) -> PathBuf {
    app_dir.join(HISTORY_FILE_NAME)
}
