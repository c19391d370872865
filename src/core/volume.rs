//! Monthly loan volume for the dashboard chart.
//!
//! Loans are bucketed by the local calendar month they were created in and
//! reduced to a fixed trailing window of [`WINDOW_MONTHS`] points, padded with
//! zero months that end at the current month when data is sparse.
use crate::core::error::ValidationError;
use crate::core::loan::Loan;
use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

/// Number of points produced for the chart.
pub const WINDOW_MONTHS: usize = 6;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month. Orders chronologically: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthKey { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            MonthKey {
                year: self.year - 1,
                month: 12,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Display label such as `Mar 2024`.
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            MONTH_ABBREVIATIONS[(self.month - 1) as usize],
            self.year
        )
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Total loan amount created in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub month: MonthKey,
    pub label: String,
    pub total: Decimal,
}

impl MonthBucket {
    fn new(month: MonthKey, total: Decimal) -> Self {
        MonthBucket {
            month,
            label: month.label(),
            total,
        }
    }
}

/// The [`WINDOW_MONTHS`] calendar months ending with the month of `today`,
/// oldest first.
pub fn trailing_window(today: NaiveDate) -> Vec<MonthKey> {
    let mut window: Vec<MonthKey> =
        std::iter::successors(Some(MonthKey::of(today)), |m| Some(m.previous()))
            .take(WINDOW_MONTHS)
            .collect();
    window.reverse();
    window
}

/// Aggregates loan volume using the local wall-clock date for padding.
pub fn aggregate(loans: &[Loan]) -> Result<Vec<MonthBucket>, ValidationError> {
    aggregate_at(loans, Local::now().date_naive())
}

/// Groups `loans` by creation month and returns exactly [`WINDOW_MONTHS`]
/// buckets in chronological order.
///
/// When fewer than [`WINDOW_MONTHS`] distinct months have data, the months of
/// the trailing window ending at `today` are added with a zero total. The
/// chronologically last [`WINDOW_MONTHS`] entries are kept, so future-dated
/// loans push older padded or real months out of the result.
///
/// A loan whose `created_at` cannot be parsed fails the whole aggregation.
pub fn aggregate_at(
    loans: &[Loan],
    today: NaiveDate,
) -> Result<Vec<MonthBucket>, ValidationError> {
    let mut grouped: BTreeMap<MonthKey, Decimal> = BTreeMap::new();
    for loan in loans {
        let created_on = loan
            .created_on()
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                id: loan.id.clone(),
                value: loan.created_at.clone(),
            })?;
        *grouped.entry(MonthKey::of(created_on)).or_default() += loan.amount;
    }
    debug!(
        "Grouped {} loans into {} months",
        loans.len(),
        grouped.len()
    );

    if grouped.len() < WINDOW_MONTHS {
        for month in trailing_window(today) {
            grouped.entry(month).or_default();
        }
    }

    let skip = grouped.len().saturating_sub(WINDOW_MONTHS);
    if skip > 0 {
        debug!("Dropping {skip} months older than the chart window");
    }
    Ok(grouped
        .into_iter()
        .skip(skip)
        .map(|(month, total)| MonthBucket::new(month, total))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loan::LoanStatus;
    use std::collections::HashSet;

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn loan(id: &str, amount: i64, created_at: &str) -> Loan {
        Loan {
            id: id.to_string(),
            user_id: None,
            amount: Decimal::from(amount),
            purpose: "Test".to_string(),
            description: None,
            status: LoanStatus::Pending,
            created_at: created_at.to_string(),
            start_date: None,
            due_date: None,
            interest_rate: None,
            term: None,
            borrower_name: None,
            loan_type: None,
        }
    }

    fn labels(buckets: &[MonthBucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.label.as_str()).collect()
    }

    fn total_for(buckets: &[MonthBucket], label: &str) -> Decimal {
        buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.total)
            .unwrap_or_else(|| panic!("missing bucket {label}"))
    }

    fn assert_window_invariants(buckets: &[MonthBucket]) {
        assert_eq!(buckets.len(), WINDOW_MONTHS);
        for pair in buckets.windows(2) {
            assert!(pair[0].month < pair[1].month, "{pair:?} out of order");
        }
        let distinct: HashSet<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(distinct.len(), WINDOW_MONTHS);
    }

    #[test]
    fn test_month_key_ordering_and_labels() {
        let dec = MonthKey::new(2023, 12).unwrap();
        let jan = MonthKey::new(2024, 1).unwrap();
        assert!(dec < jan);
        assert_eq!(jan.previous(), dec);
        assert_eq!(dec.label(), "Dec 2023");
        assert_eq!(jan.to_string(), "Jan 2024");
        assert!(MonthKey::new(2024, 0).is_none());
        assert!(MonthKey::new(2024, 13).is_none());
    }

    #[test]
    fn test_trailing_window_wraps_year() {
        let feb = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let window: Vec<String> = trailing_window(feb).iter().map(MonthKey::label).collect();
        assert_eq!(
            window,
            vec!["Sep 2023", "Oct 2023", "Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024"]
        );
    }

    #[test]
    fn test_empty_input_is_zero_padded() {
        let buckets = aggregate_at(&[], now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(
            labels(&buckets),
            vec!["Oct 2023", "Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024"]
        );
        assert!(buckets.iter().all(|b| b.total == Decimal::ZERO));
    }

    #[test]
    fn test_same_month_amounts_are_summed() {
        let loans = vec![loan("1", 100, "2024-01-15"), loan("2", 50, "2024-01-20")];
        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(total_for(&buckets, "Jan 2024"), Decimal::from(150));
        for label in ["Oct 2023", "Nov 2023", "Dec 2023", "Feb 2024", "Mar 2024"] {
            assert_eq!(total_for(&buckets, label), Decimal::ZERO);
        }
    }

    #[test]
    fn test_more_than_six_months_keeps_latest() {
        let loans: Vec<Loan> = [
            "2023-09-10",
            "2023-10-10",
            "2023-11-10",
            "2023-12-10",
            "2024-01-10",
            "2024-02-10",
            "2024-03-10",
        ]
        .iter()
        .enumerate()
        .map(|(i, date)| loan(&i.to_string(), 10, date))
        .collect();

        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(
            labels(&buckets),
            vec!["Oct 2023", "Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024"]
        );
        assert!(buckets.iter().all(|b| b.total == Decimal::from(10)));
    }

    #[test]
    fn test_december_sorts_before_january() {
        let loans = vec![loan("1", 200, "2023-12-01"), loan("2", 300, "2023-12-25")];
        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(buckets[2].label, "Dec 2023");
        assert_eq!(buckets[2].total, Decimal::from(500));
        assert_eq!(buckets[3].label, "Jan 2024");
    }

    #[test]
    fn test_six_sparse_months_are_not_padded() {
        let loans = vec![
            loan("1", 5, "2022-01-03"),
            loan("2", 6, "2022-05-03"),
            loan("3", 7, "2022-09-03"),
            loan("4", 8, "2023-01-03"),
            loan("5", 9, "2023-05-03"),
            loan("6", 10, "2023-09-03"),
        ];
        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(
            labels(&buckets),
            vec!["Jan 2022", "May 2022", "Sep 2022", "Jan 2023", "May 2023", "Sep 2023"]
        );
    }

    #[test]
    fn test_old_data_is_trimmed_in_favour_of_padding() {
        let loans = vec![loan("1", 75, "2022-06-01"), loan("2", 25, "2024-02-11")];
        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(labels(&buckets)[0], "Oct 2023");
        assert_eq!(total_for(&buckets, "Feb 2024"), Decimal::from(25));
    }

    #[test]
    fn test_future_months_stay_in_window() {
        let loans = vec![loan("1", 40, "2024-06-02")];
        let buckets = aggregate_at(&loans, now()).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(
            labels(&buckets),
            vec!["Nov 2023", "Dec 2023", "Jan 2024", "Feb 2024", "Mar 2024", "Jun 2024"]
        );
        assert_eq!(total_for(&buckets, "Jun 2024"), Decimal::from(40));
    }

    #[test]
    fn test_invalid_timestamp_fails_aggregation() {
        let loans = vec![loan("1", 100, "2024-01-15"), loan("bad", 10, "yesterday")];
        assert_eq!(
            aggregate_at(&loans, now()),
            Err(ValidationError::InvalidTimestamp {
                id: "bad".to_string(),
                value: "yesterday".to_string(),
            })
        );
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let loans = vec![
            loan("1", 100, "2024-01-15T12:00:00"),
            loan("2", 60, "2023-11-02"),
            loan("3", 15, "2024-03-01T08:30:00.500"),
        ];
        let first = aggregate_at(&loans, now()).unwrap();
        let second = aggregate_at(&loans, now()).unwrap();
        assert_eq!(first, second);
        assert_eq!(total_for(&first, "Mar 2024"), Decimal::from(15));
        assert_eq!(total_for(&first, "Nov 2023"), Decimal::from(60));
    }

    #[test]
    fn test_aggregate_uses_current_month() {
        let buckets = aggregate(&[]).unwrap();
        assert_window_invariants(&buckets);
        assert_eq!(
            buckets.last().map(|b| b.month),
            Some(MonthKey::of(Local::now().date_naive()))
        );
    }
}
