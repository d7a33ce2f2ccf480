//! Text formatting helpers shared by the front ends.
//!
//! These functions only turn already-computed values into display strings;
//! nothing here touches the database.

use crate::entities::expense;

/// Formats a whole number with comma thousands separators, e.g. `1,234,567`.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats an amount as whole currency units, dropping the fraction.
///
/// `format_amount("₹", 12345.9)` gives `₹12,345`.
#[must_use]
pub fn format_amount(currency: &str, amount: f64) -> String {
    // Cast safety: display amounts are bounded by the storable maximum
    #[allow(clippy::cast_possible_truncation)]
    let whole = amount.trunc() as i64;
    if whole < 0 {
        format!("-{currency}{}", format_thousands(-whole))
    } else {
        format!("{currency}{}", format_thousands(whole))
    }
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80%`
#[must_use]
pub fn format_progress_bar(progress_percent: u32, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = progress_percent.min(100) as usize;

    let filled = (clamped * length + 50) / 100;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent}%")
}

/// One-line summary of an expense.
#[must_use]
pub fn format_expense_line(expense: &expense::Model, currency: &str) -> String {
    format!(
        "{} | {currency}{:.2} | {} | {}",
        expense.date, expense.amount, expense.category, expense.description
    )
}
