//! Abstractions over the hosted backend that owns users and loans.

use crate::core::loan::{Loan, LoanStatus, LoanUpdate, NewLoan};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An authenticated user session. Passed explicitly to every loan call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Loan not found: {0}")]
    NotFound(String),

    #[error("Backend request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected backend response: {0}")]
    Decode(String),

    #[error("Invalid backend URL {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str)
    -> Result<Session, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError>;
}

#[async_trait]
pub trait LoanService: Send + Sync {
    /// All loans visible to the session's user, newest first.
    async fn list_loans(&self, session: &Session) -> Result<Vec<Loan>, BackendError>;

    async fn get_loan(&self, session: &Session, id: &str) -> Result<Loan, BackendError>;

    async fn create_loan(&self, session: &Session, loan: &NewLoan) -> Result<Loan, BackendError>;

    async fn update_loan(
        &self,
        session: &Session,
        id: &str,
        update: &LoanUpdate,
    ) -> Result<Loan, BackendError>;

    async fn update_status(
        &self,
        session: &Session,
        id: &str,
        status: LoanStatus,
    ) -> Result<Loan, BackendError>;

    async fn delete_loan(&self, session: &Session, id: &str) -> Result<(), BackendError>;
}

/// Both halves of the backend, as one object the commands can hold.
pub trait Backend: AuthService + LoanService {}

impl<T: AuthService + LoanService> Backend for T {}
