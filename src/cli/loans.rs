use super::ui;
use crate::core::loan::{Loan, LoanDraft, LoanStatus, LoanType, LoanUpdate, NewLoan};
use crate::core::service::{LoanService, Session};
use crate::core::stats::LoanFilter;
use anyhow::{Result, bail};
use chrono::{Local, Utc};
use comfy_table::Cell;
use futures::future::join_all;
use tracing::{debug, warn};

/// Optional overrides applied on top of an existing loan when editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanChanges {
    pub amount: Option<String>,
    pub purpose: Option<String>,
    pub description: Option<String>,
    pub borrower_name: Option<String>,
    pub interest_rate: Option<String>,
    pub term: Option<String>,
    pub loan_type: Option<LoanType>,
    pub due_date: Option<String>,
}

impl LoanChanges {
    pub fn is_empty(&self) -> bool {
        *self == LoanChanges::default()
    }

    pub fn apply(self, draft: LoanDraft) -> LoanDraft {
        LoanDraft {
            amount: self.amount.unwrap_or(draft.amount),
            purpose: self.purpose.unwrap_or(draft.purpose),
            description: self.description.unwrap_or(draft.description),
            borrower_name: self.borrower_name.unwrap_or(draft.borrower_name),
            interest_rate: self.interest_rate.unwrap_or(draft.interest_rate),
            term: self.term.unwrap_or(draft.term),
            loan_type: self.loan_type.unwrap_or(draft.loan_type),
            due_date: self.due_date.unwrap_or(draft.due_date),
        }
    }
}

pub fn render_list(all: &[Loan], filter: &LoanFilter, currency: &str) -> String {
    let matching = filter.apply(all);
    if matching.is_empty() {
        let hint = if all.is_empty() {
            "Get started by applying for your first loan: `loanboard loans new`"
        } else {
            "Try adjusting your filters or search term"
        };
        return format!(
            "No loans found\n{}",
            ui::style_text(hint, ui::StyleType::Subtle)
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Purpose"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
        ui::header_cell("Created"),
        ui::header_cell("Due"),
    ]);
    for loan in &matching {
        table.add_row(vec![
            Cell::new(&loan.id),
            Cell::new(&loan.purpose),
            ui::amount_cell(ui::format_money(loan.amount, currency, 2)),
            ui::status_cell(loan.status),
            Cell::new(ui::format_date(&loan.created_at)),
            Cell::new(
                loan.shown_due_date()
                    .map_or_else(|| "N/A".to_string(), ui::format_date),
            ),
        ]);
    }

    format!(
        "{}\n\n{}\n{} of {} loans",
        ui::style_text("My Loans", ui::StyleType::Title),
        table,
        matching.len(),
        all.len()
    )
}

pub fn render_details(loan: &Loan, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    let optional = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());
    let rows = vec![
        ("Amount", ui::format_money(loan.amount, currency, 2)),
        ("Purpose", loan.purpose.clone()),
        ("Borrower", optional(loan.borrower_name.clone())),
        ("Loan Type", loan.loan_type.unwrap_or_default().to_string()),
        (
            "Interest Rate",
            optional(loan.interest_rate.map(|r| format!("{r}%"))),
        ),
        ("Term", optional(loan.term.map(|t| format!("{t} months")))),
        ("Created", ui::format_date(&loan.created_at)),
        (
            "Start Date",
            optional(loan.start_date.as_deref().map(ui::format_date)),
        ),
        (
            "Due Date",
            optional(loan.shown_due_date().map(ui::format_date)),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![ui::header_cell(label), Cell::new(value)]);
    }
    table.add_row(vec![ui::header_cell("Status"), ui::status_cell(loan.status)]);

    let mut output = format!(
        "Loan: {}\n\n{}",
        ui::style_text(&loan.id, ui::StyleType::Title),
        table
    );
    if let Some(description) = loan.description.as_deref().filter(|d| !d.trim().is_empty()) {
        output.push_str(&format!("\n\n{description}"));
    }

    let actions = match loan.status {
        LoanStatus::Pending => {
            Some("approve or reject this application with `loanboard loans approve|reject ID`")
        }
        LoanStatus::Approved => {
            Some("mark this loan as repaid with `loanboard loans mark-paid ID`")
        }
        LoanStatus::Rejected | LoanStatus::Paid => None,
    };
    if let Some(actions) = actions {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(&format!("Next: {actions}"), ui::StyleType::Subtle)
        ));
    }
    output
}

pub async fn list(
    backend: &dyn LoanService,
    session: &Session,
    filter: &LoanFilter,
    currency: &str,
) -> Result<()> {
    let loans = ui::with_spinner("Fetching loans...", backend.list_loans(session)).await?;
    debug!("Fetched {} loans, filter {:?}", loans.len(), filter);
    println!("{}", render_list(&loans, filter, currency));
    Ok(())
}

pub async fn show(
    backend: &dyn LoanService,
    session: &Session,
    id: &str,
    currency: &str,
) -> Result<()> {
    let loan = ui::with_spinner("Fetching loan...", backend.get_loan(session, id)).await?;
    println!("{}", render_details(&loan, currency));
    Ok(())
}

pub async fn create(
    backend: &dyn LoanService,
    session: &Session,
    draft: LoanDraft,
    currency: &str,
) -> Result<()> {
    let today = Local::now().date_naive();
    let terms = draft.validate(today)?;
    let new_loan = NewLoan::new(&session.user_id, terms, today);
    let loan = ui::with_spinner(
        "Submitting application...",
        backend.create_loan(session, &new_loan),
    )
    .await?;
    println!(
        "{}\n",
        ui::style_text("Loan application submitted", ui::StyleType::TotalValue)
    );
    println!("{}", render_details(&loan, currency));
    Ok(())
}

pub async fn edit(
    backend: &dyn LoanService,
    session: &Session,
    id: &str,
    changes: LoanChanges,
    currency: &str,
) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to update. Pass at least one field to change");
    }
    let existing = ui::with_spinner("Fetching loan...", backend.get_loan(session, id)).await?;
    let due_date_entered = changes.due_date.is_some();
    let draft = changes.apply(LoanDraft::from(&existing));

    let today = Local::now().date_naive();
    let terms = draft.validate_edit(today, due_date_entered)?;
    let update = LoanUpdate::new(terms, today, Utc::now());
    let loan = ui::with_spinner(
        "Updating loan...",
        backend.update_loan(session, id, &update),
    )
    .await?;
    println!(
        "{}\n",
        ui::style_text("Loan updated successfully", ui::StyleType::TotalValue)
    );
    println!("{}", render_details(&loan, currency));
    Ok(())
}

pub async fn set_status(
    backend: &dyn LoanService,
    session: &Session,
    id: &str,
    status: LoanStatus,
) -> Result<()> {
    let existing = ui::with_spinner("Fetching loan...", backend.get_loan(session, id)).await?;
    let next = existing.status.transition_to(status)?;
    let loan = ui::with_spinner(
        "Updating status...",
        backend.update_status(session, id, next),
    )
    .await?;
    println!(
        "Loan {} {} successfully",
        ui::style_text(&loan.id, ui::StyleType::TotalLabel),
        loan.status
    );
    Ok(())
}

/// Deletes every id concurrently and reports each outcome. Fails when any
/// deletion failed.
pub async fn delete(backend: &dyn LoanService, session: &Session, ids: &[String]) -> Result<()> {
    let deletions = ids.iter().map(|id| async move {
        let result = backend.delete_loan(session, id).await;
        (id, result)
    });
    let results = ui::with_spinner("Deleting...", join_all(deletions)).await;

    let mut failures = 0;
    for (id, result) in results {
        match result {
            Ok(()) => println!("Loan {id} deleted successfully"),
            Err(e) => {
                warn!("Failed to delete loan {}: {}", id, e);
                println!(
                    "{}",
                    ui::style_text(&format!("Error deleting loan {id}: {e}"), ui::StyleType::Error)
                );
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} deletions failed", ids.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::service::AuthService;
    use crate::core::stats::StatusFilter;
    use crate::providers::MemoryBackend;
    use rust_decimal::Decimal;

    async fn signed_in() -> (MemoryBackend, Session) {
        let backend = MemoryBackend::new();
        let session = backend.sign_up("ada@example.com", "pw", "Ada").await.unwrap();
        (backend, session)
    }

    fn draft(amount: &str) -> LoanDraft {
        let due = Local::now().date_naive() + chrono::Duration::days(90);
        LoanDraft {
            amount: amount.to_string(),
            purpose: "Home renovation".to_string(),
            borrower_name: "Ada".to_string(),
            due_date: due.format("%Y-%m-%d").to_string(),
            ..LoanDraft::default()
        }
    }

    #[test]
    fn test_changes_override_only_given_fields() {
        let base = draft("100");
        let changes = LoanChanges {
            amount: Some("250".to_string()),
            loan_type: Some(LoanType::Vehicle),
            ..LoanChanges::default()
        };
        assert!(!changes.is_empty());
        let updated = changes.apply(base.clone());
        assert_eq!(updated.amount, "250");
        assert_eq!(updated.loan_type, LoanType::Vehicle);
        assert_eq!(updated.purpose, base.purpose);
        assert!(LoanChanges::default().is_empty());
    }

    #[test]
    fn test_empty_list_hints() {
        console::set_colors_enabled(false);
        let filter = LoanFilter::default();
        assert!(render_list(&[], &filter, "USD").contains("applying for your first loan"));
    }

    #[tokio::test]
    async fn test_create_and_filter() {
        console::set_colors_enabled(false);
        let (backend, session) = signed_in().await;
        create(&backend, &session, draft("1200"), "USD").await.unwrap();

        let loans = backend.list_loans(&session).await.unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].amount, Decimal::from(1200));

        let approved_only = LoanFilter {
            search: None,
            status: StatusFilter::Only(LoanStatus::Approved),
        };
        let output = render_list(&loans, &approved_only, "USD");
        assert!(output.contains("Try adjusting your filters"));

        let output = render_list(&loans, &LoanFilter::default(), "USD");
        assert!(output.contains("$1,200.00"));
        assert!(output.contains("1 of 1 loans"));
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_submitted() {
        let (backend, session) = signed_in().await;
        let err = create(&backend, &session, draft("0"), "USD")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please enter a valid amount");
        assert!(backend.list_loans(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_lifecycle() {
        let (backend, session) = signed_in().await;
        create(&backend, &session, draft("800"), "USD").await.unwrap();
        let id = backend.list_loans(&session).await.unwrap()[0].id.clone();

        assert!(set_status(&backend, &session, &id, LoanStatus::Paid).await.is_err());
        set_status(&backend, &session, &id, LoanStatus::Approved)
            .await
            .unwrap();
        assert!(set_status(&backend, &session, &id, LoanStatus::Rejected).await.is_err());
        set_status(&backend, &session, &id, LoanStatus::Paid)
            .await
            .unwrap();
        assert_eq!(
            backend.get_loan(&session, &id).await.unwrap().status,
            LoanStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_edit_keeps_unchanged_fields() {
        let (backend, session) = signed_in().await;
        create(&backend, &session, draft("800"), "USD").await.unwrap();
        let id = backend.list_loans(&session).await.unwrap()[0].id.clone();

        let changes = LoanChanges {
            purpose: Some("Kitchen".to_string()),
            ..LoanChanges::default()
        };
        edit(&backend, &session, &id, changes, "USD").await.unwrap();
        let loan = backend.get_loan(&session, &id).await.unwrap();
        assert_eq!(loan.purpose, "Kitchen");
        assert_eq!(loan.amount, Decimal::from(800));

        assert!(edit(&backend, &session, &id, LoanChanges::default(), "USD")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_edit_purpose_of_overdue_loan() {
        let (backend, session) = MemoryBackend::demo().await;
        let overdue = backend.list_loans(&session).await.unwrap().remove(0);
        assert_eq!(overdue.due_date.as_deref(), Some("2023-11-18"));

        let changes = LoanChanges {
            purpose: Some("Kitchen".to_string()),
            ..LoanChanges::default()
        };
        edit(&backend, &session, &overdue.id, changes, "USD")
            .await
            .unwrap();
        let loan = backend.get_loan(&session, &overdue.id).await.unwrap();
        assert_eq!(loan.purpose, "Kitchen");
        assert_eq!(loan.due_date.as_deref(), Some("2023-11-18"));

        let past_due = LoanChanges {
            due_date: Some("2023-12-01".to_string()),
            ..LoanChanges::default()
        };
        let err = edit(&backend, &session, &overdue.id, past_due, "USD")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Due date 2023-12-01 is in the past");
    }

    #[tokio::test]
    async fn test_delete_reports_partial_failure() {
        let (backend, session) = signed_in().await;
        create(&backend, &session, draft("800"), "USD").await.unwrap();
        let id = backend.list_loans(&session).await.unwrap()[0].id.clone();

        let err = delete(&backend, &session, &[id, "missing".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 deletions failed");
        assert!(backend.list_loans(&session).await.unwrap().is_empty());
    }

    #[test]
    fn test_details_show_next_action() {
        console::set_colors_enabled(false);
        let loan = Loan {
            id: "l-1".to_string(),
            user_id: None,
            amount: Decimal::from(2000),
            purpose: "Education".to_string(),
            description: Some("Tuition for the spring term".to_string()),
            status: LoanStatus::Pending,
            created_at: "2024-02-20".to_string(),
            start_date: Some("2024-02-20".to_string()),
            due_date: None,
            interest_rate: Some(Decimal::new(45, 1)),
            term: Some(24),
            borrower_name: None,
            loan_type: Some(LoanType::Education),
        };
        let output = render_details(&loan, "USD");
        assert!(output.contains("$2,000.00"));
        assert!(output.contains("4.5%"));
        assert!(output.contains("24 months"));
        assert!(output.contains("Education Loan"));
        assert!(output.contains("Tuition for the spring term"));
        assert!(output.contains("approve or reject"));
    }
}
