use super::ui;
use crate::core::loan::Loan;
use crate::core::service::{LoanService, Session};
use crate::core::stats::{LoanStats, RECENT_LOANS, recent_loans};
use crate::core::volume::{self, MonthBucket};
use anyhow::Result;
use comfy_table::Cell;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

const CHART_WIDTH: usize = 40;

impl LoanStats {
    pub fn display_as_table(&self, currency: &str) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Total Amount"),
            ui::header_cell("Active Loans"),
            ui::header_cell("Approval Rate"),
            ui::header_cell("Pending Approval"),
        ]);
        table.add_row(vec![
            Cell::new(ui::style_text(
                &ui::format_money(self.total_amount, currency, 0),
                ui::StyleType::TotalValue,
            )),
            Cell::new(self.loan_count.to_string()),
            Cell::new(format!("{:.0}%", self.approval_rate)),
            Cell::new(self.pending_count.to_string()),
        ]);
        table.add_row(vec![
            Cell::new(ui::style_text("Total amount borrowed", ui::StyleType::Subtle)),
            Cell::new(ui::style_text("Total number of loans", ui::StyleType::Subtle)),
            Cell::new(ui::style_text(
                &format!(
                    "{} out of {} approved",
                    self.approved_count, self.loan_count
                ),
                ui::StyleType::Subtle,
            )),
            Cell::new(ui::style_text("Awaiting review", ui::StyleType::Subtle)),
        ]);
        table.to_string()
    }
}

/// Renders the monthly volume as one horizontal bar per month, scaled to the
/// largest month.
pub fn render_chart(buckets: &[MonthBucket], currency: &str) -> String {
    let max = buckets
        .iter()
        .map(|b| b.total)
        .max()
        .unwrap_or(Decimal::ZERO);
    let label_width = buckets.iter().map(|b| b.label.len()).max().unwrap_or(0);

    let mut output = format!(
        "{}\n{}\n\n",
        ui::style_text("Loan Volume", ui::StyleType::Title),
        ui::style_text("Monthly loan application amount", ui::StyleType::Subtle)
    );
    for bucket in buckets {
        let width = if max > Decimal::ZERO {
            (bucket.total / max * Decimal::from(CHART_WIDTH))
                .round()
                .to_usize()
                .unwrap_or(0)
        } else {
            0
        };
        output.push_str(&format!(
            "{:<label_width$} │{:<CHART_WIDTH$} {}\n",
            bucket.label,
            "█".repeat(width),
            ui::format_money(bucket.total, currency, 0),
        ));
    }
    output
}

pub fn render_recent(loans: &[&Loan], currency: &str) -> String {
    let mut output = format!(
        "{}\n{}\n\n",
        ui::style_text("Recent Loans", ui::StyleType::Title),
        ui::style_text("Your latest loan applications", ui::StyleType::Subtle)
    );
    if loans.is_empty() {
        output.push_str("No loan applications yet. Run `loanboard loans new` to apply for a loan.");
        return output;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Purpose"),
        ui::header_cell("Created"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
    ]);
    for loan in loans {
        table.add_row(vec![
            Cell::new(&loan.id),
            Cell::new(&loan.purpose),
            Cell::new(ui::format_date(&loan.created_at)),
            ui::amount_cell(ui::format_money(loan.amount, currency, 2)),
            ui::status_cell(loan.status),
        ]);
    }
    output.push_str(&table.to_string());
    output
}

pub async fn run(backend: &dyn LoanService, session: &Session, currency: &str) -> Result<()> {
    let loans = ui::with_spinner("Fetching loans...", backend.list_loans(session)).await?;
    debug!("Fetched {} loans for dashboard", loans.len());

    let stats = LoanStats::from_loans(&loans);
    let buckets = volume::aggregate(&loans)?;
    let recent = recent_loans(&loans, RECENT_LOANS);

    println!(
        "Dashboard: {}\n",
        ui::style_text(session.display_name(), ui::StyleType::Title)
    );
    println!("{}", stats.display_as_table(currency));
    ui::print_separator();
    println!("{}", render_chart(&buckets, currency));
    ui::print_separator();
    println!("{}", render_recent(&recent, currency));
    Ok(())
}
