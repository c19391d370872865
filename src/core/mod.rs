//! Domain types and calculations, independent of the terminal and the network.

pub mod config;
pub mod error;
pub mod loan;
pub mod log;
pub mod service;
pub mod stats;
pub mod volume;

// Re-export main types for cleaner imports
pub use error::ValidationError;
pub use loan::{Loan, LoanDraft, LoanStatus, LoanType};
pub use service::{AuthService, Backend, BackendError, LoanService, Session};
