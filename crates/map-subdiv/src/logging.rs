/*!
Logging and profiling setup for the command-line driver.

Logs go to stderr through a `tracing-subscriber` fmt layer filtered by `RUST_LOG`. With the
`profiling` feature, setting `ENABLE_PROFILING` also records a Chrome trace
(`trace-<timestamp>.json`) of every instrumented function; the file is flushed when the returned
guard is dropped.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Keeps the profiling output open until dropped
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Initialize logging with sensible defaults
pub fn setup_logging_and_profiling() -> LoggingGuard {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());

    #[cfg(feature = "profiling")]
    {
        let (chrome_layer, guard) = if std::env::var("ENABLE_PROFILING").is_ok() {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        } else {
            (None, None)
        };
        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();
        tracing::info!(recording = guard.is_some(), "Logging initialized with profiling support");
        LoggingGuard { _chrome: guard }
    }

    #[cfg(not(feature = "profiling"))]
    {
        tracing_subscriber::registry().with(fmt_layer).init();
        tracing::debug!("Logging initialized (profiling disabled in this build)");
        LoggingGuard {}
    }
}
