//! Dashboard figures and list queries computed over a snapshot of loans.
use crate::core::error::ValidationError;
use crate::core::loan::{Loan, LoanStatus};
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::str::FromStr;

/// Number of loans shown in the "Recent Loans" panel.
pub const RECENT_LOANS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct LoanStats {
    pub total_amount: Decimal,
    pub loan_count: usize,
    pub approved_count: usize,
    pub pending_count: usize,
    /// Percentage of loans that are approved, 0 when there are no loans.
    pub approval_rate: f64,
}

impl LoanStats {
    pub fn from_loans(loans: &[Loan]) -> Self {
        let count_with = |status: LoanStatus| loans.iter().filter(|l| l.status == status).count();
        let loan_count = loans.len();
        let approved_count = count_with(LoanStatus::Approved);
        let approval_rate = if loan_count > 0 {
            approved_count as f64 / loan_count as f64 * 100.0
        } else {
            0.0
        };

        LoanStats {
            total_amount: loans.iter().map(|l| l.amount).sum(),
            loan_count,
            approved_count,
            pending_count: count_with(LoanStatus::Pending),
            approval_rate,
        }
    }
}

/// The most recently created loans, newest first by creation instant. Loans
/// with an unparseable timestamp sort after every dated loan.
pub fn recent_loans(loans: &[Loan], limit: usize) -> Vec<&Loan> {
    let mut sorted: Vec<&Loan> = loans.iter().collect();
    sorted.sort_by_key(|l| Reverse(l.created_instant()));
    sorted.truncate(limit);
    sorted
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LoanStatus),
}

impl FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// Search and status filters for the loan list. Both must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanFilter {
    pub search: Option<String>,
    pub status: StatusFilter,
}

impl LoanFilter {
    pub fn matches(&self, loan: &Loan) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => loan
                .purpose
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => loan.status == status,
        };
        search_ok && status_ok
    }

    pub fn apply<'a>(&self, loans: &'a [Loan]) -> Vec<&'a Loan> {
        loans.iter().filter(|l| self.matches(l)).collect()
    }
}
