//! Table rendering for the `list` command and the load pick list.

use std::fmt::Write;

use crate::store::{PortfolioEntry, ResponseFileEntry};

/// Numbered table of response files, newest first.
pub fn render_responses(entries: &[ResponseFileEntry]) -> String {
    if entries.is_empty() {
        return "No response files found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<4} {:<20} {:<45} {:>10}", "#", "Student ID", "File", "Size (KB)");
    let _ = writeln!(out, "{}", "-".repeat(82));
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<20} {:<45} {:>10.1}",
            i + 1,
            entry.owner.to_string(),
            entry.name(),
            entry.size as f64 / 1024.0
        );
    }
    out
}

pub fn render_portfolios(portfolios: &[PortfolioEntry]) -> String {
    if portfolios.is_empty() {
        return "No student portfolios found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<20} {:>10}  {}", "Student ID", "Statements", "Latest File");
    let _ = writeln!(out, "{}", "-".repeat(82));
    for p in portfolios {
        let _ = writeln!(
            out,
            "{:<20} {:>10}  {}",
            p.student_id,
            p.statements,
            p.latest.as_deref().unwrap_or("No statements")
        );
    }
    out
}
