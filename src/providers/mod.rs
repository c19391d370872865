pub mod hosted;
pub mod memory;

pub use hosted::HostedBackend;
pub use memory::MemoryBackend;
