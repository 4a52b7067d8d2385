//! File-backed token list.
//!
//! The whole list is read on every access and rewritten on every mutation.
//! There is no schema version and no integrity check beyond parsing.

use parking_lot::Mutex;
use shared_types::{Network, TokenRecord, TokenStatus};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::RegistryError;

/// File holding the token list, relative to the data directory.
pub const TOKENS_FILE: &str = "tokens.json";

/// File holding the selected network, relative to the data directory.
pub const NETWORK_FILE: &str = "network";

pub struct TokenRegistry {
    tokens_path: PathBuf,
    network_path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl TokenRegistry {
    /// Open the registry stored under `data_dir`, creating the directory.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| RegistryError::io(data_dir, e))?;
        Ok(Self {
            tokens_path: data_dir.join(TOKENS_FILE),
            network_path: data_dir.join(NETWORK_FILE),
            write_lock: Mutex::new(()),
        })
    }

    pub fn tokens_path(&self) -> &Path {
        &self.tokens_path
    }

    /// Every stored token, in insertion order. A missing file is an empty list.
    pub fn list(&self) -> Result<Vec<TokenRecord>, RegistryError> {
        let content = match fs::read_to_string(&self.tokens_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::io(&self.tokens_path, e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|source| RegistryError::Corrupt {
            path: self.tokens_path.clone(),
            source,
        })
    }

    /// Append a record.
    pub fn add(&self, record: TokenRecord) -> Result<(), RegistryError> {
        if record.address.trim().is_empty() {
            return Err(RegistryError::EmptyAddress);
        }
        let _guard = self.write_lock.lock();
        let mut tokens = self.list()?;
        info!(id = %record.id, address = %record.address, "Adding token");
        tokens.push(record);
        self.write(&tokens)
    }

    /// Record a token launched elsewhere. Blank admin keys are stored as absent.
    pub fn import(
        &self,
        address: &str,
        admin_public_key: Option<&str>,
        admin_private_key: Option<&str>,
    ) -> Result<TokenRecord, RegistryError> {
        let non_blank = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let record = TokenRecord::launched(
            address.trim(),
            non_blank(admin_public_key),
            non_blank(admin_private_key),
        );
        self.add(record.clone())?;
        Ok(record)
    }

    /// Remove the record with `id`. Returns false if there was none.
    pub fn remove(&self, id: &str) -> Result<bool, RegistryError> {
        let _guard = self.write_lock.lock();
        let mut tokens = self.list()?;
        let before = tokens.len();
        tokens.retain(|t| t.id != id);
        if tokens.len() == before {
            return Ok(false);
        }
        info!(id = id, "Removed token");
        self.write(&tokens)?;
        Ok(true)
    }

    /// First record whose address matches.
    pub fn find_by_address(&self, address: &str) -> Result<Option<TokenRecord>, RegistryError> {
        Ok(self.list()?.into_iter().find(|t| t.address == address))
    }

    /// Change the status of every record with `address`. Returns how many changed.
    pub fn set_status(&self, address: &str, status: TokenStatus) -> Result<usize, RegistryError> {
        let _guard = self.write_lock.lock();
        let mut tokens = self.list()?;
        let mut changed = 0;
        for token in tokens.iter_mut().filter(|t| t.address == address) {
            token.status = status;
            changed += 1;
        }
        if changed > 0 {
            self.write(&tokens)?;
        }
        Ok(changed)
    }

    /// The selected network, Devnet if none was saved.
    pub fn network(&self) -> Result<Network, RegistryError> {
        match fs::read_to_string(&self.network_path) {
            Ok(content) if content.trim().is_empty() => Ok(Network::default()),
            Ok(content) => Ok(content.parse()?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Network::default()),
            Err(e) => Err(RegistryError::io(&self.network_path, e)),
        }
    }

    pub fn set_network(&self, network: Network) -> Result<(), RegistryError> {
        fs::write(&self.network_path, network.as_str())
            .map_err(|e| RegistryError::io(&self.network_path, e))?;
        info!(network = %network, "Network selection saved");
        Ok(())
    }

    fn write(&self, tokens: &[TokenRecord]) -> Result<(), RegistryError> {
        let content = serde_json::to_string_pretty(tokens)?;
        let staging = self.tokens_path.with_extension("json.tmp");
        fs::write(&staging, content).map_err(|e| RegistryError::io(&staging, e))?;
        fs::rename(&staging, &self.tokens_path)
            .map_err(|e| RegistryError::io(&self.tokens_path, e))?;
        debug!(count = tokens.len(), path = %self.tokens_path.display(), "Token list written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, TokenRegistry) {
        let dir = TempDir::new().unwrap();
        let registry = TokenRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, registry) = registry();
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_and_list_preserves_order() {
        let (_dir, registry) = registry();
        registry
            .add(TokenRecord::launched("B62qfirst", None, None))
            .unwrap();
        registry
            .add(TokenRecord::launched(
                "B62qsecond",
                Some("B62qadmin".into()),
                Some("EKadmin".into()),
            ))
            .unwrap();

        let tokens = registry.list().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].address, "B62qfirst");
        assert_eq!(tokens[1].admin_private_key.as_deref(), Some("EKadmin"));
    }

    #[test]
    fn test_file_uses_browser_record_shape() {
        let (_dir, registry) = registry();
        let record = registry.import("B62qtoken", Some(""), Some("EKkey")).unwrap();

        let raw = fs::read_to_string(registry.tokens_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
                "id": record.id,
                "address": "B62qtoken",
                "adminPrivateKey": "EKkey",
                "status": "Launched"
            }])
        );
    }

    #[test]
    fn test_import_rejects_blank_address() {
        let (_dir, registry) = registry();
        assert!(matches!(
            registry.import("  ", None, None),
            Err(RegistryError::EmptyAddress)
        ));
    }

    #[test]
    fn test_remove() {
        let (_dir, registry) = registry();
        let kept = registry.import("B62qkeep", None, None).unwrap();
        let dropped = registry.import("B62qdrop", None, None).unwrap();

        assert!(registry.remove(&dropped.id).unwrap());
        assert!(!registry.remove(&dropped.id).unwrap());
        assert_eq!(registry.list().unwrap(), vec![kept]);
    }

    #[test]
    fn test_find_by_address_and_set_status() {
        let (_dir, registry) = registry();
        registry.import("B62qone", None, None).unwrap();

        assert_eq!(
            registry.set_status("B62qone", TokenStatus::Pending).unwrap(),
            1
        );
        let found = registry.find_by_address("B62qone").unwrap().unwrap();
        assert_eq!(found.status, TokenStatus::Pending);
        assert!(registry.find_by_address("B62qother").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let (_dir, registry) = registry();
        fs::write(registry.tokens_path(), "not json").unwrap();
        assert!(matches!(
            registry.list(),
            Err(RegistryError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_reads_records_written_by_browser() {
        let (_dir, registry) = registry();
        fs::write(
            registry.tokens_path(),
            r#"[{"id":"1717000000000","address":"B62qx","adminPublicKey":"B62qa","status":"Pending"}]"#,
        )
        .unwrap();
        let tokens = registry.list().unwrap();
        assert_eq!(tokens[0].id, "1717000000000");
        assert_eq!(tokens[0].status, TokenStatus::Pending);
        assert!(tokens[0].admin_private_key.is_none());
    }

    #[test]
    fn test_network_defaults_to_devnet_and_persists() {
        let (dir, registry) = registry();
        assert_eq!(registry.network().unwrap(), Network::Devnet);

        registry.set_network(Network::Mainnet).unwrap();
        let reopened = TokenRegistry::open(dir.path()).unwrap();
        assert_eq!(reopened.network().unwrap(), Network::Mainnet);
    }

    #[test]
    fn test_lowercase_stored_network_is_accepted() {
        let (dir, registry) = registry();
        fs::write(dir.path().join(NETWORK_FILE), "mainnet").unwrap();
        assert_eq!(registry.network().unwrap(), Network::Mainnet);
    }
}
