//! Human-readable rendering of task events and reports.

use presale_models::DocumentCatalogue;
use presale_runtime::{TaskEvent, TaskReport};

/// One progress line for an event, or `None` for events not worth showing.
pub fn describe(event: &TaskEvent) -> Option<String> {
    let line = match event {
        TaskEvent::TaskCreated { task } => format!("[task] created {}", task),
        TaskEvent::StatusChanged { to, .. } => format!("[task] status: {}", to),
        TaskEvent::Progress {
            percent, elapsed, ..
        } => format!("[task] {}% ({}s)", percent, elapsed.as_secs()),
        TaskEvent::PollError { error, .. } => format!("[warn] status check failed: {}", error),
        TaskEvent::Completed { elapsed, .. } => {
            format!("[task] completed after {}s", elapsed.as_secs())
        }
        TaskEvent::ReferencesFound { count, .. } => format!("[files] {} referenced", count),
        TaskEvent::DownloadStarted { name, index, total } => {
            format!("[files] {}/{} {}", index, total, name)
        }
        TaskEvent::DownloadRetrying {
            name,
            attempt,
            delay,
            error,
        } => format!(
            "[warn] {} attempt {} failed ({}), retrying in {}s",
            name,
            attempt,
            error,
            delay.as_secs()
        ),
        TaskEvent::DownloadExhausted {
            name,
            attempts,
            error,
        } => format!("[warn] {} not retrieved after {} attempts: {}", name, attempts, error),
        TaskEvent::Failed { .. }
        | TaskEvent::TimedOut { .. }
        | TaskEvent::Cancelled { .. }
        | TaskEvent::DownloadFinished { .. }
        | TaskEvent::Reconciled { .. } => return None,
    };
    Some(line)
}

/// Summary printed after a successful run.
pub fn render_report(report: &TaskReport) -> String {
    let mut out = format!("Task {}\n", report.task);

    out.push_str(&format!("\nDelivered ({}):\n", report.artifacts.len()));
    for artifact in &report.artifacts {
        out.push_str(&format!(
            "  {}  ->  {}\n",
            artifact.display_name,
            artifact.local_path.display()
        ));
    }

    let completion = &report.completion;
    if completion.missing.is_empty() {
        out.push_str("\nAll expected files delivered.\n");
    } else {
        out.push_str(&format!("\nMissing ({}):\n", completion.missing.len()));
        for name in &completion.missing {
            out.push_str(&format!("  {}\n", name));
        }
    }

    if !completion.unexpected.is_empty() {
        out.push_str(&format!("\nUnexpected ({}):\n", completion.unexpected.len()));
        for name in &completion.unexpected {
            out.push_str(&format!("  {}\n", name));
        }
    }

    if !report.not_retrieved.is_empty() {
        out.push_str(&format!("\nNot retrieved ({}):\n", report.not_retrieved.len()));
        for file in &report.not_retrieved {
            out.push_str(&format!(
                "  {} ({} attempts: {})\n",
                file.reference.display_name, file.attempts, file.error
            ));
        }
    }

    out
}

/// Catalogue listing for `manifest --catalogue`.
pub fn render_catalogue(catalogue: &DocumentCatalogue) -> String {
    let mut out = String::new();
    for doc in catalogue.entries() {
        let marker = if doc.mandatory { " (always)" } else { "" };
        out.push_str(&format!(
            "{:<14} {}{}\n{:<14} {}\n",
            doc.id, doc.file_name, marker, "", doc.description
        ));
    }
    out
}
