//! Local storage for the signed-in session.
//!
//! The session is the only state kept on this machine; loans live in the
//! hosted backend.
pub mod disk;
pub mod memory;

use crate::core::service::Session;
use anyhow::Result;

pub use disk::DiskSessionStore;
pub use memory::MemorySessionStore;

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
