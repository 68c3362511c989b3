use super::*;

const DEFAULT_FILTER: &str = "warn,solominer=info,stratum=info";

/// Installs the global subscriber. Events are written to stderr from a background thread, so
/// logging never blocks mining. Keep the guard alive until exit to flush.
pub(crate) fn init() -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = non_blocking(io::stderr());

    let filter = if logs_enabled() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(DEFAULT_FILTER)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_filter(filter),
        )
        .init();

    guard
}

pub(crate) fn logs_enabled() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}
