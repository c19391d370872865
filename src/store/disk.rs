use super::SessionStore;
use crate::core::service::Session;
use anyhow::{Context, Result};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const SESSION_KEY: &str = "current";

/// Session persisted in a `fjall` keyspace under the data directory.
pub struct DiskSessionStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSessionStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("session");
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        let keyspace = Config::new(&path)
            .open()
            .with_context(|| format!("Failed to open session store at {}", path.display()))?;
        let partition = keyspace
            .open_partition("session", PartitionCreateOptions::default())
            .context("Failed to open session partition")?;
        debug!("Opened session store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl SessionStore for DiskSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match self.partition.get(SESSION_KEY)? {
            Some(bytes) => {
                let session: Session =
                    serde_json::from_slice(&bytes).context("Stored session is corrupt")?;
                debug!("Loaded session for {}", session.email);
                Ok(Some(session))
            }
            None => {
                debug!("No stored session");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.partition
            .insert(SESSION_KEY, serde_json::to_vec(session)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Saved session for {}", session.email);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.partition.remove(SESSION_KEY)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Cleared stored session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> Session {
        Session {
            access_token: "jwt".to_string(),
            user_id: "u-1".to_string(),
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            expires_at: None,
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let store = DiskSessionStore::open(dir.path()).unwrap();

        assert!(store.load().unwrap().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = DiskSessionStore::open(dir.path()).unwrap();
            store.save(&session()).unwrap();
        }
        let store = DiskSessionStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));
    }
}
