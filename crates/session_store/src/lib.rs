mod error;
mod history;
mod paths;
mod store;

pub use error::SessionStoreError;
pub use history::{format_listing, HistoryEntry, HistoryLedger};
pub use paths::{
    app_dir, app_dir_from, default_history_file, default_session_dir, APP_DIR_NAME,
    APP_HOME_ENV, HISTORY_FILE_NAME, SESSIONS_DIR,
};
pub use store::{read_session, write_session};
