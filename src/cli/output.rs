//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::{ColoredString, Colorize};

use crate::domain::CoverageSummary;

/// Rates at or above this render green.
pub const GOOD_RATE: f64 = 0.8;
/// Rates at or above this (and below [`GOOD_RATE`]) render yellow.
pub const FAIR_RATE: f64 = 0.5;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Percentage of `rate`, colored by how good it is.
pub fn rate(rate: f64) -> ColoredString {
    let text = format!("{:5.1}%", rate * 100.0);
    if rate >= GOOD_RATE {
        text.green()
    } else if rate >= FAIR_RATE {
        text.yellow()
    } else {
        text.red()
    }
}

/// One-line summary with a colored rate.
pub fn summary_line(summary: &CoverageSummary) -> String {
    format!(
        "{} {}/{} lines in {} packages",
        rate(summary.coverage_rate),
        summary.covered_lines,
        summary.total_lines,
        summary.package_count
    )
}
