use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber. Filtering follows `RUST_LOG` and falls
/// back to `info`. Output goes to stderr so stdout stays free for results.
/// Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Routes output through libtest's capture so later tests stay quiet.
    fn init_captured() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn initializing_over_an_installed_subscriber_is_harmless() {
        init_captured();
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}
