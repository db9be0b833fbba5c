use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "performer-sync.log";

/// Initializes the logging system with both console and file output.
///
/// If the log directory cannot be created, a warning goes to stderr and only
/// console logging is set up.
pub fn init_logging() {
    let file_writer = file_writer(Path::new(LOG_DIR));

    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => (Some(fmt::layer().json().with_writer(writer)), Some(guard)),
        None => (None, None),
    };

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise info for this crate, warn for dependencies
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("performer_sync=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // Keep the writer guard alive for the life of the process so logs flush on exit
    if let Some(guard) = guard {
        std::mem::forget(guard);
    }
}

/// Daily-rotated writer under `dir`, or `None` (with a stderr warning) when the
/// directory or the appender cannot be set up.
fn file_writer(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!(
            "warning: cannot create log directory {}: {}; file logging disabled",
            dir.display(),
            e
        );
        return None;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .build(dir)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!(
                "warning: cannot open log file in {}: {}; file logging disabled",
                dir.display(),
                e
            );
            None
        }
    }
}
