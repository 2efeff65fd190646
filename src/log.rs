//! Debug logging system.
//!
//! When `debug` is set in the config, logs to `<module_dir>\maxdb_provider.log`.

use std::path::Path;
use std::sync::Mutex;
use std::sync::OnceLock;

pub const LOG_FILE_NAME: &str = "maxdb_provider.log";

struct Logger {
    log_path: Option<std::path::PathBuf>,
}

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Initialize the logger. Only the first call per process has any effect.
pub fn init(debug: bool, dir: Option<&Path>) {
    let log_path = match (debug, dir) {
        (true, Some(dir)) => {
            let path = dir.join(LOG_FILE_NAME);
            // Create/truncate with header
            let _ = std::fs::write(&path, "=== MaxDBProvider Debug Log ===\n");
            Some(path)
        }
        _ => None,
    };

    let _ = LOGGER.set(Mutex::new(Logger { log_path }));
}

/// Log a message. Only outputs if debug logging was enabled.
pub fn log(msg: &str) {
    let Some(logger) = LOGGER.get() else { return };
    let Ok(logger) = logger.lock() else { return };

    // The host is a GUI installer; nothing goes to stdout/stderr.
    if let Some(ref path) = logger.log_path {
        use std::io::Write;
        if let Ok(mut f) = std::fs::OpenOptions::new().append(true).open(path) {
            let _ = writeln!(f, "{}", msg);
        }
    }
}

/// Convenience macro for formatted logging with [DEBUG] prefix.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::log::log(&format!("[DEBUG] {}", format!($($arg)*)))
    };
}
