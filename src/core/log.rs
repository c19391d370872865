use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const APP_TARGET: &str = "loanboard";

/// Only this crate's events pass, at DEBUG with `--verbose` and not at all
/// without it.
fn app_targets(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    Targets::new().with_target(APP_TARGET, level)
}

/// Installs the global subscriber on stderr.
///
/// Logs appear only with `--verbose`. `RUST_LOG` can narrow what `--verbose`
/// shows but cannot enable anything on its own, and other crates' events are
/// never shown.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "off" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_targets(verbose))
        .with(env_filter)
        .init();
}
