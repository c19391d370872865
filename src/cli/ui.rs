use crate::core::loan::{LoanStatus, parse_timestamp};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// A right-aligned cell for money values.
pub fn amount_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Colour-coded status badge.
pub fn status_cell(status: LoanStatus) -> Cell {
    let color = match status {
        LoanStatus::Pending => Color::Yellow,
        LoanStatus::Approved => Color::Green,
        LoanStatus::Rejected => Color::Red,
        LoanStatus::Paid => Color::Blue,
    };
    Cell::new(status.to_string())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

/// Formats a money amount as `$1,234.56` for USD or `EUR 1,234.56` otherwise.
pub fn format_money(amount: Decimal, currency: &str, decimals: u32) -> String {
    let rounded = amount.round_dp(decimals);
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if currency.eq_ignore_ascii_case("USD") {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}{} {grouped}", currency.to_uppercase())
    }
}

/// Formats a backend timestamp as `Jan 15, 2024`, or echoes it when unparseable.
pub fn format_date(value: &str) -> String {
    parse_timestamp(value).map_or_else(|| value.to_string(), |d| d.format("%b %-d, %Y").to_string())
}

/// Creates a spinner shown while waiting on the backend.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Awaits `future` with a spinner on screen.
pub async fn with_spinner<T>(message: &str, future: impl Future<Output = T>) -> T {
    let pb = new_spinner(message);
    let output = future.await;
    pb.finish_and_clear();
    output
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::from(1234567), "USD", 2), "$1,234,567.00");
        assert_eq!(format_money(Decimal::new(99995, 2), "usd", 0), "$1,000");
        assert_eq!(format_money(Decimal::new(5005, 1), "EUR", 2), "EUR 500.50");
        assert_eq!(format_money(Decimal::from(100), "USD", 0), "$100");
        assert_eq!(format_money(Decimal::from(-2500), "USD", 0), "-$2,500");
        assert_eq!(format_money(Decimal::ZERO, "USD", 0), "$0");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-01-05"), "Jan 5, 2024");
        assert_eq!(format_date("2023-12-25T10:00:00"), "Dec 25, 2023");
        assert_eq!(format_date("soon"), "soon");
    }
}
