//! Configuration options for StateKV.

use common::StorageConfig;
use serde::{Deserialize, Serialize};

/// Configuration for opening a [`StateDb`](crate::StateDb).
///
/// Loaded by the `statekv` binary from TOML:
///
/// ```toml
/// [storage]
/// type = "InMemory"
///
/// [write]
/// await_durable = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Options applied to every write.
    #[serde(default)]
    pub write: WriteOptions,
}

/// Options for write operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// If true, waits for the write to be durable before returning.
    /// Default: false (returns once the write is visible).
    #[serde(default)]
    pub await_durable: bool,
}

impl From<&WriteOptions> for common::WriteOptions {
    fn from(options: &WriteOptions) -> Self {
        common::WriteOptions {
            await_durable: options.await_durable,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::storage::config::{ObjectStoreConfig, SlateDbStorageConfig};

    use super::*;

    #[test]
    fn should_default_to_in_memory_storage() {
        // when
        let config: Config = toml::from_str("").unwrap();

        // then
        assert_eq!(config.storage, StorageConfig::InMemory);
        assert!(!config.write.await_durable);
    }

    #[test]
    fn should_parse_slatedb_config_from_toml() {
        // given
        let toml = r#"
            [storage]
            type = "SlateDb"
            path = "ledger-state"

            [storage.object_store]
            type = "Local"
            path = "/tmp/statekv"

            [write]
            await_durable = true
        "#;

        // when
        let config: Config = toml::from_str(toml).unwrap();

        // then
        match config.storage {
            StorageConfig::SlateDb(SlateDbStorageConfig {
                path,
                object_store: ObjectStoreConfig::Local(local),
                settings_path,
            }) => {
                assert_eq!(path, "ledger-state");
                assert_eq!(local.path, "/tmp/statekv");
                assert!(settings_path.is_none());
            }
            other => panic!("unexpected storage config: {:?}", other),
        }
        assert!(config.write.await_durable);
    }
}
