//! Typed failures raised by the domain layer before anything reaches the backend.

use crate::core::loan::LoanStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields")]
    MissingRequiredFields,

    #[error("Please enter a valid amount")]
    InvalidAmount,

    #[error("Please enter a valid interest rate: {0:?}")]
    InvalidInterestRate(String),

    #[error("Please enter a valid term in months: {0:?}")]
    InvalidTerm(String),

    #[error("Please enter a valid due date (YYYY-MM-DD): {0:?}")]
    InvalidDueDate(String),

    #[error("Due date {0} is in the past")]
    DueDateInPast(String),

    #[error("Unknown loan status: {0:?}")]
    UnknownStatus(String),

    #[error("Unknown loan type: {0:?}")]
    UnknownLoanType(String),

    #[error("Cannot move a {from} loan to {to}")]
    InvalidTransition { from: LoanStatus, to: LoanStatus },

    #[error("Loan {id} has an unparseable creation timestamp: {value:?}")]
    InvalidTimestamp { id: String, value: String },
}
