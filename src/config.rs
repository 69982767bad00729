use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Medtrack";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the on-device key-value store.
pub const STORE_FILE_NAME: &str = "medtrack.db";

/// Trailing window (in days) used for the adherence rate.
pub const ADHERENCE_WINDOW_DAYS: i64 = 7;

/// Title shown on every reminder notification.
pub const REMINDER_TITLE: &str = "Medicine reminder";

/// Body text of a reminder notification for the given medicine.
pub fn reminder_body(medicine_name: &str) -> String {
    format!("Time to take {medicine_name}")
}

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "medtrack_lib=debug,info"
    } else {
        "medtrack_lib=info,warn"
    }
}

/// Get the application data directory.
/// Platform local data dir (e.g. ~/.local/share/Medtrack), falling back to
/// the working directory when the platform reports none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the key-value store file.
pub fn store_path() -> PathBuf {
    app_data_dir().join(STORE_FILE_NAME)
}
