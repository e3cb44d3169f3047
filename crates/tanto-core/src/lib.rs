//! Tanto Core Library
//!
//! Non-destructive, track-based audio/video timeline engine.
//! This library contains the timeline data model, the composition
//! algorithms, workspace management and the editing command layer.
//!
//! Decoding, compositing and encoding of actual media is delegated to a
//! [`core::media::MediaBackend`] implementation supplied by the host.

pub mod core;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

// =============================================================================
// Logging
// =============================================================================

/// Default filter directive when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "tanto_core=info";

/// Initializes the global tracing subscriber.
///
/// Logs go to stdout, and additionally to a daily rolling file in `log_dir`
/// when one is given. The returned guard must be kept alive for the file
/// writer to flush. Calling this twice is harmless; the second subscriber is
/// simply not installed.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let _ = std::fs::create_dir_all(dir);
            let file_appender = tracing_appender::rolling::daily(dir, "tanto.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    // Avoid panics if already initialized (tests, embedding hosts).
    let _ = tracing::subscriber::set_global_default(subscriber);
    guard
}
