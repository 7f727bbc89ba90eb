pub use tracing::{self, debug, error, info, instrument, trace, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter applied by [`setup_test_log`] when `RUST_LOG` is not set
pub const DEFAULT_TEST_FILTER: &str = "citadel=debug";

/// Sets up the logging for any crate. A panic anywhere is logged, then the process exits
pub fn setup_log() {
    std::panic::set_hook(Box::new(|info| {
        error!(target: "citadel", "Panic occurred: {}", info);
        std::process::exit(1);
    }));

    setup_log_no_panic_hook()
}

/// Installs the subscriber using `RUST_LOG`. Calling this more than once is harmless
pub fn setup_log_no_panic_hook() {
    let _ = builder(EnvFilter::from_default_env()).finish().try_init();
}

/// Installs the subscriber for tests. Panics keep their default behavior so `#[should_panic]`
/// and assertion failures still report normally. Falls back to [`DEFAULT_TEST_FILTER`]
pub fn setup_test_log() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));
    let _ = builder(filter).with_test_writer().finish().try_init();
}

fn builder(
    filter: EnvFilter,
) -> SubscriberBuilder<
    tracing_subscriber::fmt::format::DefaultFields,
    tracing_subscriber::fmt::format::Format,
    EnvFilter,
> {
    SubscriberBuilder::default()
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_idempotent() {
        setup_test_log();
        setup_test_log();
        setup_log_no_panic_hook();
        trace!(target: "citadel", "still logging after repeated setup");
    }
}
