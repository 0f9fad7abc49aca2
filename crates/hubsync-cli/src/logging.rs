use tracing_subscriber::EnvFilter;

/// Install the console subscriber.
///
/// `RUST_LOG` wins over `default_level` from the config; `--verbose` wins over both.
pub fn init_tracing(default_level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
