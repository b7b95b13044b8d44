//! Plain-text rendering of a [`ValidationReport`].

use std::fmt::Write;

use super::validator::{ValidationIssue, ValidationReport};

const RULE: &str = "============================================================";

/// Renders `report` for `database` as deterministic text.
///
/// Sections: summary, verdict, issues, warnings, found/missing tables,
/// found/missing indexes. Every list is sorted lexicographically and empty
/// sections are omitted.
pub fn render_report(report: &ValidationReport, database: &str) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Data warehouse schema validation report");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Database: {database}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Tables expected:  {}", summary.total_tables_expected);
    let _ = writeln!(out, "  Tables found:     {}", summary.total_tables_found);
    let _ = writeln!(out, "  Tables missing:   {}", summary.total_tables_missing);
    let _ = writeln!(out, "  Indexes expected: {}", summary.total_indexes_expected);
    let _ = writeln!(out, "  Indexes found:    {}", summary.total_indexes_found);
    let _ = writeln!(out, "  Indexes missing:  {}", summary.total_indexes_missing);
    let _ = writeln!(out, "  Issues:           {}", summary.total_issues);
    let _ = writeln!(out, "  Warnings:         {}", summary.total_warnings);
    let _ = writeln!(out);

    if report.is_valid {
        let _ = writeln!(out, "Result: VALID - schema is compatible");
    } else {
        let _ = writeln!(out, "Result: INVALID - schema has blocking issues");
    }
    let _ = writeln!(out);

    section(&mut out, "Issues", issue_lines(&report.issues));
    section(&mut out, "Warnings", issue_lines(&report.warnings));
    section(&mut out, "Tables found", report.tables_found.clone());
    section(&mut out, "Tables missing", report.tables_missing.clone());
    section(&mut out, "Indexes found", report.indexes_found.clone());
    section(&mut out, "Indexes missing", report.indexes_missing.clone());

    out.push_str(RULE);
    out
}

fn issue_lines(issues: &[ValidationIssue]) -> Vec<String> {
    issues
        .iter()
        .map(|i| format!("[{}] {}", i.kind, i.message))
        .collect()
}

fn section(out: &mut String, title: &str, mut lines: Vec<String>) {
    if lines.is_empty() {
        return;
    }
    lines.sort();
    let _ = writeln!(out, "{title}:");
    for line in lines {
        let _ = writeln!(out, "  - {line}");
    }
    let _ = writeln!(out);
}
