use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a stderr subscriber filtered by `RUST_LOG`. Safe to call more than
/// once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }
}
