use super::SessionStore;
use crate::core::service::Session;
use anyhow::{Result, anyhow};
use std::sync::RwLock;

/// Session kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let guard = self
            .inner
            .read()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow!("session lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
