//! Loan records as stored by the hosted backend, plus the application form
//! that produces new records and edits.

use crate::core::error::ValidationError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LoanStatus::Pending => "pending",
                LoanStatus::Approved => "approved",
                LoanStatus::Rejected => "rejected",
                LoanStatus::Paid => "paid",
            }
        )
    }
}

impl FromStr for LoanStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(LoanStatus::Pending),
            "approved" => Ok(LoanStatus::Approved),
            "rejected" => Ok(LoanStatus::Rejected),
            "paid" => Ok(LoanStatus::Paid),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

impl LoanStatus {
    /// Checks that a loan in this status may move to `next`.
    ///
    /// Only pending loans can be approved or rejected, and only approved loans
    /// can be marked as paid.
    pub fn transition_to(self, next: LoanStatus) -> Result<LoanStatus, ValidationError> {
        match (self, next) {
            (LoanStatus::Pending, LoanStatus::Approved)
            | (LoanStatus::Pending, LoanStatus::Rejected)
            | (LoanStatus::Approved, LoanStatus::Paid) => Ok(next),
            (from, to) => Err(ValidationError::InvalidTransition { from, to }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    #[default]
    Personal,
    Business,
    Education,
    Mortgage,
    Vehicle,
}

impl Display for LoanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LoanType::Personal => "Personal Loan",
                LoanType::Business => "Business Loan",
                LoanType::Education => "Education Loan",
                LoanType::Mortgage => "Mortgage",
                LoanType::Vehicle => "Vehicle Loan",
            }
        )
    }
}

impl FromStr for LoanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "personal" => Ok(LoanType::Personal),
            "business" => Ok(LoanType::Business),
            "education" => Ok(LoanType::Education),
            "mortgage" => Ok(LoanType::Mortgage),
            "vehicle" => Ok(LoanType::Vehicle),
            _ => Err(ValidationError::UnknownLoanType(s.to_string())),
        }
    }
}

/// A loan row as returned by the backend's `loans` table.
///
/// `due_date` and `loan_type` are not columns of the hosted table. They are
/// read when present and only kept by the in-process backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub purpose: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: LoanStatus,
    pub created_at: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub interest_rate: Option<Decimal>,
    #[serde(default)]
    pub term: Option<u32>,
    #[serde(default)]
    pub borrower_name: Option<String>,
    #[serde(default)]
    pub loan_type: Option<LoanType>,
}

impl Loan {
    /// Local calendar date the loan was created on, if the timestamp parses.
    pub fn created_on(&self) -> Option<NaiveDate> {
        parse_timestamp(&self.created_at)
    }

    /// Exact creation instant, used to order loans newest first.
    pub fn created_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.created_at)
    }

    /// The date shown as "due": the due date when known, else the start date.
    pub fn shown_due_date(&self) -> Option<&str> {
        self.due_date.as_deref().or(self.start_date.as_deref())
    }
}

/// Parses a backend timestamp into an instant. Naive values are taken as
/// local time, plain dates as local midnight.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Parses a backend timestamp into a local calendar date.
///
/// Accepts RFC 3339 instants (converted to the local zone), naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` date-times taken as local, and plain dates.
pub fn parse_timestamp(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Local).date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Raw form input for a new or edited loan application.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDraft {
    pub amount: String,
    pub purpose: String,
    pub description: String,
    pub borrower_name: String,
    pub interest_rate: String,
    pub term: String,
    pub loan_type: LoanType,
    pub due_date: String,
}

impl Default for LoanDraft {
    fn default() -> Self {
        LoanDraft {
            amount: String::new(),
            purpose: String::new(),
            description: String::new(),
            borrower_name: String::new(),
            interest_rate: "5.0".to_string(),
            term: "12".to_string(),
            loan_type: LoanType::Personal,
            due_date: String::new(),
        }
    }
}

impl From<&Loan> for LoanDraft {
    fn from(loan: &Loan) -> Self {
        let defaults = LoanDraft::default();
        LoanDraft {
            amount: loan.amount.to_string(),
            purpose: loan.purpose.clone(),
            description: loan.description.clone().unwrap_or_default(),
            borrower_name: loan.borrower_name.clone().unwrap_or_default(),
            interest_rate: loan
                .interest_rate
                .map_or(defaults.interest_rate, |r| r.to_string()),
            term: loan.term.map_or(defaults.term, |t| t.to_string()),
            loan_type: loan.loan_type.unwrap_or_default(),
            due_date: loan
                .shown_due_date()
                .and_then(|d| d.split('T').next())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Validated loan terms, ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTerms {
    pub amount: Decimal,
    pub purpose: String,
    pub description: String,
    pub borrower_name: String,
    pub interest_rate: Decimal,
    pub term: u32,
    pub loan_type: LoanType,
    /// Always set for new applications. An edit may carry none over.
    pub due_date: Option<NaiveDate>,
}

impl LoanDraft {
    /// Checks a new application. The due date is required and may not be
    /// before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<LoanTerms, ValidationError> {
        self.check(today, true)
    }

    /// Checks an edited application. A due date carried over from the stored
    /// loan may be missing or already past; a newly entered one gets the same
    /// rules as [`LoanDraft::validate`].
    pub fn validate_edit(
        &self,
        today: NaiveDate,
        due_date_entered: bool,
    ) -> Result<LoanTerms, ValidationError> {
        self.check(today, due_date_entered)
    }

    fn check(
        &self,
        today: NaiveDate,
        due_date_entered: bool,
    ) -> Result<LoanTerms, ValidationError> {
        let required = [&self.amount, &self.purpose, &self.borrower_name];
        let due_date_missing = due_date_entered && self.due_date.trim().is_empty();
        if due_date_missing || required.iter().any(|field| field.trim().is_empty()) {
            return Err(ValidationError::MissingRequiredFields);
        }

        let amount = Decimal::from_str(self.amount.trim())
            .ok()
            .filter(|a| *a > Decimal::ZERO)
            .ok_or(ValidationError::InvalidAmount)?;

        let interest_rate = Decimal::from_str(self.interest_rate.trim())
            .ok()
            .filter(|r| !r.is_sign_negative())
            .ok_or_else(|| ValidationError::InvalidInterestRate(self.interest_rate.clone()))?;

        let term = self
            .term
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|t| *t >= 1)
            .ok_or_else(|| ValidationError::InvalidTerm(self.term.clone()))?;

        let parsed = NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d");
        let due_date = if due_date_entered {
            let due_date =
                parsed.map_err(|_| ValidationError::InvalidDueDate(self.due_date.clone()))?;
            if due_date < today {
                return Err(ValidationError::DueDateInPast(due_date.to_string()));
            }
            Some(due_date)
        } else {
            parsed.ok()
        };

        Ok(LoanTerms {
            amount,
            purpose: self.purpose.trim().to_string(),
            description: self.description.trim().to_string(),
            borrower_name: self.borrower_name.trim().to_string(),
            interest_rate,
            term,
            loan_type: self.loan_type,
            due_date,
        })
    }
}

/// Insert payload for a new application. New loans always start as pending.
///
/// The hosted table has no `loan_type` or `due_date` column, so those stay
/// off the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLoan {
    pub user_id: String,
    pub amount: Decimal,
    pub purpose: String,
    pub description: String,
    pub status: LoanStatus,
    pub interest_rate: Decimal,
    pub term: u32,
    pub borrower_name: String,
    #[serde(skip_serializing)]
    pub loan_type: LoanType,
    pub start_date: NaiveDate,
    #[serde(skip_serializing)]
    pub due_date: Option<NaiveDate>,
}

impl NewLoan {
    pub fn new(user_id: &str, terms: LoanTerms, today: NaiveDate) -> Self {
        NewLoan {
            user_id: user_id.to_string(),
            amount: terms.amount,
            purpose: terms.purpose,
            description: terms.description,
            status: LoanStatus::Pending,
            interest_rate: terms.interest_rate,
            term: terms.term,
            borrower_name: terms.borrower_name,
            loan_type: terms.loan_type,
            start_date: today,
            due_date: terms.due_date,
        }
    }
}

/// Patch payload for an edited application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanUpdate {
    pub amount: Decimal,
    pub purpose: String,
    pub description: String,
    pub interest_rate: Decimal,
    pub term: u32,
    pub borrower_name: String,
    #[serde(skip_serializing)]
    pub loan_type: LoanType,
    pub start_date: NaiveDate,
    #[serde(skip_serializing)]
    pub due_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl LoanUpdate {
    pub fn new(terms: LoanTerms, today: NaiveDate, now: DateTime<Utc>) -> Self {
        LoanUpdate {
            amount: terms.amount,
            purpose: terms.purpose,
            description: terms.description,
            interest_rate: terms.interest_rate,
            term: terms.term,
            borrower_name: terms.borrower_name,
            loan_type: terms.loan_type,
            start_date: today,
            due_date: terms.due_date,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub status: LoanStatus,
    pub updated_at: DateTime<Utc>,
}
