use migrate_core::diagnostics::{group_by_file, source_context};
use migrate_core::{Diagnostic, ScriptReport, TaskStatus};
use serde::Serialize;

use crate::scripts::{source_for, CatalogEntry};

/// Lines of source shown above and below an offending line.
const CONTEXT_LINES: u32 = 2;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

pub fn print_reports(
    catalog: &[CatalogEntry],
    reports: &[ScriptReport],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&reports);
    }
    for report in reports {
        println!("{}: {}", report.script, report.status);
        for task in &report.tasks {
            match &task.status {
                TaskStatus::Succeeded => println!("  ok       {}", task.title),
                TaskStatus::Failed { reason } => println!("  FAILED   {}: {}", task.title, reason),
                TaskStatus::Skipped => println!("  skipped  {}", task.title),
            }
        }
        if !report.diagnostics.is_empty() {
            println!();
            print!("{}", render_diagnostics(catalog, &report.diagnostics));
        }
    }
    Ok(())
}

/// Diagnostics grouped by file, each followed by the surrounding source
/// lines with the offending one marked `>`.
pub fn render_diagnostics(catalog: &[CatalogEntry], diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for (file, group) in group_by_file(diagnostics) {
        out.push_str(file);
        out.push('\n');
        let source = source_for(catalog, file);
        for diagnostic in group {
            out.push_str(&format!(
                "  {}:{}  {}\n",
                diagnostic.line, diagnostic.column, diagnostic.message
            ));
            let Some(source) = source.as_deref() else {
                continue;
            };
            let context = source_context(source, diagnostic.line, CONTEXT_LINES);
            let width = context
                .last()
                .map(|(n, _)| n.to_string().len())
                .unwrap_or(1);
            for (n, text) in context {
                let marker = if n == diagnostic.line { '>' } else { ' ' };
                out.push_str(&format!("  {marker} {n:>width$} | {text}\n"));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrate_core::action::SourceLocation;
    use migrate_core::ErrorKind;

    #[test]
    fn diagnostics_show_marked_context() {
        let catalog: Vec<CatalogEntry> = Vec::new();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("script.rs");
        std::fs::write(&path, "one\ntwo\nthree\nfour\nfive\nsix\n").unwrap();
        let file = path.to_string_lossy().to_string();

        let diagnostics = vec![Diagnostic::at(
            &SourceLocation::new(file.clone(), 4),
            ErrorKind::MissingProperty,
            "title is missing.",
        )];
        let out = render_diagnostics(&catalog, &diagnostics);

        assert!(out.starts_with(&file));
        assert!(out.contains("title is missing."));
        assert!(out.contains("> 4 | four"));
        assert!(out.contains("  2 | two"));
        assert!(out.contains("  6 | six"));
        assert!(!out.contains("one"));
    }

    #[test]
    fn unreadable_file_prints_message_only() {
        let diagnostics = vec![Diagnostic::at(
            &SourceLocation::new("/nonexistent/script.rs", 3),
            ErrorKind::Script,
            "boom",
        )];
        let out = render_diagnostics(&[], &diagnostics);
        assert!(out.contains("boom"));
        assert!(!out.contains('|'));
    }
}
