use tracing_subscriber::{fmt, EnvFilter};

use crate::config::is_truthy;

/// Quiets the SDK's own chatter unless `RUST_LOG` asks for it.
const SDK_DIRECTIVES: &str = "aws_config=warn,aws_smithy_runtime=warn,aws_sdk_s3=warn";

/// True when `DEBUG` is set to a truthy value.
pub fn debug_enabled() -> bool {
    std::env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false)
}

fn default_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("{level},{SDK_DIRECTIVES}")
}

/// Install the stderr subscriber. `RUST_LOG` wins over `DEBUG`.
pub fn init() {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug_enabled())));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dtocost=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_levels() {
        assert!(default_filter(false).starts_with("info,"));
        assert!(default_filter(true).starts_with("debug,"));
        assert!(default_filter(true).contains("aws_config=warn"));
    }
}
