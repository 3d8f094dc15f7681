//! Shared helpers for the `storage` and `task-status` operator CLIs.

/// Redact a config value if its key contains one of `secret`, `password`,
/// `token`, or `key` (case-insensitive substring), for safe display in
/// `storage info`.
pub fn redact_config_value(key: &str, value: &str) -> String {
    let lower = key.to_ascii_lowercase();
    let sensitive = ["secret", "password", "token", "key"];
    if sensitive.iter().any(|needle| lower.contains(needle)) {
        "***redacted***".to_string()
    } else {
        value.to_string()
    }
}

pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("slidereel=info".parse().unwrap()))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_keys_containing_sensitive_substrings() {
        assert_eq!(redact_config_value("S3_SECRET_ACCESS_KEY", "abc123"), "***redacted***");
        assert_eq!(redact_config_value("OPENAI_API_KEY", "sk-xyz"), "***redacted***");
        assert_eq!(redact_config_value("S3_BUCKET_NAME", "my-bucket"), "my-bucket");
    }
}
