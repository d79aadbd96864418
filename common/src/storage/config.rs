//! Serializable storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects and configures the storage backend.
///
/// In TOML:
///
/// ```toml
/// [storage]
/// type = "SlateDb"
/// path = "ledger-state"
///
/// [storage.object_store]
/// type = "Local"
/// path = "/var/lib/statekv"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Volatile storage; contents are lost when the process exits.
    #[default]
    InMemory,
    SlateDb(SlateDbStorageConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateDbStorageConfig {
    /// Path prefix of the database inside the object store.
    pub path: String,
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file. When absent, SlateDB loads its
    /// settings from the environment or falls back to its defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectStoreConfig {
    /// Directory the object store writes into. Created if missing.
    pub path: String,
}
