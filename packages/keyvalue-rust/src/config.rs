//! Key-value storage settings.

use serde::Deserialize;
use widekv_client::{ConfigError, DEFAULT_ALIAS};

/// Where key-value collections live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeyValueSettings {
    /// Connection alias in the client settings.
    pub connection: String,
    /// Table of persistent items.
    pub table: String,
    /// Table of expiring items.
    pub expirable_table: String,
    /// Secondary index on `(collection, expire)` of the expiring table.
    pub expire_index: String,
}

impl Default for KeyValueSettings {
    fn default() -> Self {
        Self {
            connection: DEFAULT_ALIAS.to_string(),
            table: "key_value".to_string(),
            expirable_table: "key_value_expire".to_string(),
            expire_index: "expired_index".to_string(),
        }
    }
}

impl KeyValueSettings {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] when the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(KeyValueSettings::from_json("{}").unwrap(), KeyValueSettings::default());
    }

    #[test]
    fn fields_override_individually() {
        let settings =
            KeyValueSettings::from_json(r#"{"connection": "sessions", "table": "kv"}"#).unwrap();
        assert_eq!(settings.connection, "sessions");
        assert_eq!(settings.table, "kv");
        assert_eq!(settings.expirable_table, "key_value_expire");
        assert_eq!(settings.expire_index, "expired_index");
    }
}
