use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the stderr subscriber. `RUST_LOG` wins over the flags.
///
/// `interactive` silences logging by default so it does not draw over the
/// terminal UI.
pub fn init(verbose: bool, interactive: bool) {
    let default = match (interactive, verbose) {
        (true, _) => "shortsboard=off",
        (false, true) => "shortsboard=debug",
        (false, false) => "shortsboard=info",
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
