//! Connection settings.
//!
//! Settings are plain data deriving [`Deserialize`]; where they come from is
//! up to the host. [`ClientSettings::from_json`] covers the common case.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::requests::BillingMode;

/// Alias used when the caller names no connection.
pub const DEFAULT_ALIAS: &str = "default";

/// Per-table overrides of connection-wide defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub consistent_read: Option<bool>,
    pub aws_billing: Option<BillingMode>,
}

/// Bounded polling used while waiting for a table to appear or disappear.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WaiterSettings {
    /// Seconds between two status checks.
    pub delay_secs: u64,
    /// Status checks before giving up.
    pub max_attempts: u32,
}

impl WaiterSettings {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for WaiterSettings {
    fn default() -> Self {
        Self {
            delay_secs: 3,
            max_attempts: 5,
        }
    }
}

/// Settings of one named connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Custom endpoint URL, e.g. a local emulator.
    pub endpoint: Option<String>,
    pub region: String,
    /// API version label, kept for parity with other clients.
    pub version: String,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
    /// Instance-wide read consistency default.
    pub consistent_read: bool,
    /// Billing applied to tables created without one.
    pub aws_billing: Option<BillingMode>,
    pub table_settings: HashMap<String, TableSettings>,
    pub waiter: WaiterSettings,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            version: "latest".to_string(),
            aws_access_key: None,
            aws_secret_key: None,
            consistent_read: false,
            aws_billing: None,
            table_settings: HashMap::new(),
            waiter: WaiterSettings::default(),
        }
    }
}

impl ConnectionSettings {
    /// Consistency for reads against `table`: the table override, else the
    /// connection default.
    #[must_use]
    pub fn consistent_read_for(&self, table: &str) -> bool {
        self.table_settings
            .get(table)
            .and_then(|t| t.consistent_read)
            .unwrap_or(self.consistent_read)
    }

    /// Billing for a new `table`: the table override, else the connection default.
    #[must_use]
    pub fn billing_for(&self, table: &str) -> Option<BillingMode> {
        self.table_settings
            .get(table)
            .and_then(|t| t.aws_billing)
            .or(self.aws_billing)
    }
}

/// All configured connections, keyed by alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ClientSettings {
    connections: HashMap<String, ConnectionSettings>,
}

impl ClientSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{"<alias>": {..connection settings..}, ...}`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] when the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }

    /// Adds or replaces a connection.
    #[must_use]
    pub fn with_connection(mut self, alias: impl Into<String>, settings: ConnectionSettings) -> Self {
        self.connections.insert(alias.into(), settings);
        self
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&ConnectionSettings> {
        self.connections.get(alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings = ClientSettings::from_json(r#"{"default": {"region": "eu-west-1"}}"#).unwrap();
        let conn = settings.get(DEFAULT_ALIAS).unwrap();
        assert_eq!(conn.region, "eu-west-1");
        assert_eq!(conn.version, "latest");
        assert!(!conn.consistent_read);
        assert_eq!(conn.waiter, WaiterSettings::default());
        assert_eq!(conn.waiter.delay(), Duration::from_secs(3));
        assert!(conn.aws_billing.is_none());
    }

    #[test]
    fn table_overrides_win_over_connection_defaults() {
        let settings = ClientSettings::from_json(
            r#"{
                "default": {
                    "consistent_read": false,
                    "aws_billing": {"mode": "pay_per_request"},
                    "table_settings": {
                        "key_value": {
                            "consistent_read": true,
                            "aws_billing": {
                                "mode": "provisioned",
                                "read_capacity_units": 10,
                                "write_capacity_units": 4
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let conn = settings.get(DEFAULT_ALIAS).unwrap();
        assert!(conn.consistent_read_for("key_value"));
        assert!(!conn.consistent_read_for("other"));
        assert_eq!(
            conn.billing_for("key_value"),
            Some(BillingMode::Provisioned {
                read_capacity_units: 10,
                write_capacity_units: 4,
            })
        );
        assert_eq!(conn.billing_for("other"), Some(BillingMode::PayPerRequest));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = ClientSettings::from_json(r#"{"default": {"waiter": {"max_attempts": "many"}}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSettings(_)));
    }
}
