use tracing_subscriber::EnvFilter;

/// Initialize stdout logging.
///
/// Level defaults to `info`; override with `RUST_LOG`
/// (e.g. `RUST_LOG=strangler_proxy=debug` to see every migration decision).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}
