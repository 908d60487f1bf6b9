use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,citysense=debug";

/// Install the global JSON log subscriber.
/// - RUST_LOG respected; default to "info,citysense=debug"
/// - safe to call more than once, later calls are no-ops
pub fn init(service_name: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %service_name, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert!(filter.to_string().contains("citysense=debug"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init("citysense-test");
        init("citysense-test");
    }
}
