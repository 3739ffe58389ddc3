//! Error types for backing-store calls and client configuration.

/// Errors raised by a [`BackingStore`](crate::BackingStore) call or by the
/// [`Connection`](crate::Connection) facade around it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("requested resource not found: {0}")]
    ResourceNotFound(String),
    #[error("resource in use: {0}")]
    ResourceInUse(String),
    #[error("the conditional request failed")]
    ConditionalCheckFailed,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("throughput exceeded: {0}")]
    Throughput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("table {table} did not reach the expected state after {attempts} attempts")]
    WaiterExhausted { table: String, attempts: u32 },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// Whether the error is a setup problem that must reach the caller
    /// instead of being absorbed into an empty result.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::WaiterExhausted { .. })
    }
}

/// Configuration errors. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("nonexistent connection alias: {0}")]
    UnknownAlias(String),
    #[error("missing default billing settings for connection {alias}")]
    MissingBilling { alias: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_setup_errors_are_fatal() {
        assert!(StoreError::from(ConfigError::UnknownAlias("x".into())).is_fatal());
        assert!(StoreError::WaiterExhausted {
            table: "t".into(),
            attempts: 5
        }
        .is_fatal());
        assert!(!StoreError::ConditionalCheckFailed.is_fatal());
        assert!(!StoreError::Transport("reset".into()).is_fatal());
    }

    #[test]
    fn messages_name_the_culprit() {
        let err = StoreError::from(ConfigError::UnknownAlias("reports".into()));
        assert_eq!(
            err.to_string(),
            "configuration error: nonexistent connection alias: reports"
        );
    }
}
