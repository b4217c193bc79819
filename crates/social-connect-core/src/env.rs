// Environment detection and logger initialization.

use std::sync::OnceLock;

/// Cached environment mode.
static ENV_MODE: OnceLock<EnvMode> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Production,
    Development,
    Test,
}

/// Detect the current environment mode.
/// Checks `SOCIAL_CONNECT_ENV` then `RUST_ENV`.
pub fn detect_env_mode() -> EnvMode {
    *ENV_MODE.get_or_init(|| {
        let env_val = std::env::var("SOCIAL_CONNECT_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        parse_env_mode(&env_val)
    })
}

fn parse_env_mode(value: &str) -> EnvMode {
    match value.to_lowercase().as_str() {
        "production" | "prod" => EnvMode::Production,
        "test" | "testing" => EnvMode::Test,
        _ => EnvMode::Development,
    }
}

pub fn is_production() -> bool {
    detect_env_mode() == EnvMode::Production
}

/// Non-empty environment variable.
pub(crate) fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Initialize the `tracing` subscriber with appropriate defaults.
/// `RUST_LOG` wins when set.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production() {
            EnvFilter::new("social_connect=info,social_connect_core=info,social_connect_memory=info")
        } else {
            EnvFilter::new("social_connect=debug,social_connect_core=debug,social_connect_memory=debug")
        }
    });

    // A second init (e.g., from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_mode() {
        assert_eq!(parse_env_mode("production"), EnvMode::Production);
        assert_eq!(parse_env_mode("PROD"), EnvMode::Production);
        assert_eq!(parse_env_mode("test"), EnvMode::Test);
        assert_eq!(parse_env_mode(""), EnvMode::Development);
    }

    #[test]
    fn test_init_logger_twice_is_harmless() {
        init_logger();
        init_logger();
    }
}
