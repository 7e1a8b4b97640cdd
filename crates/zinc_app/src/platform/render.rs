use zinc_core::{Status, TaskListView, TaskRowView, FALLBACK_STAGE_MESSAGE};

const TITLE_WIDTH: usize = 40;

/// Terminal lines for the current task list: a summary, then one row per task.
pub fn render(view: &TaskListView) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.ordered.len() + 1);
    lines.push(format!(
        "Tasks: {} | Active: {} | Completed: {}",
        view.ordered.len(),
        view.active.len(),
        view.completed.len()
    ));
    lines.extend(view.ordered.iter().map(render_row));
    lines
}

fn render_row(row: &TaskRowView) -> String {
    // Unconfirmed rows are local guesses until the worker reports back.
    let marker = if row.confirmed { ' ' } else { '*' };
    let mut line = format!(
        "{marker} {:<width$} {}",
        truncate(&row.title, TITLE_WIDTH),
        status_text(row),
        width = TITLE_WIDTH
    );
    if let Some(eta) = &row.transcription_eta {
        line.push_str(&format!(" | subtitles {eta}"));
    }
    line
}

fn status_text(row: &TaskRowView) -> String {
    match &row.status {
        Status::Pending => "Pending".to_string(),
        Status::Downloading => {
            let mut text = format!("Downloading {:.1}%", row.progress);
            if let Some(speed) = &row.speed {
                text.push_str(&format!(" at {speed}"));
            }
            if let Some(eta) = &row.eta {
                text.push_str(&format!(", {eta} left"));
            }
            text
        }
        Status::Transcribing(_) => format!(
            "{} {:.0}%",
            row.stage_message.unwrap_or(FALLBACK_STAGE_MESSAGE),
            row.transcription_progress.unwrap_or(0.0)
        ),
        Status::Completed { warning: None } => match &row.output_path {
            Some(path) => format!("Completed -> {path}"),
            None => "Completed".to_string(),
        },
        Status::Completed {
            warning: Some(warning),
        } => format!("Completed with warning: {warning}"),
        Status::Error { message } => format!("Failed: {message}"),
        Status::Cancelled => "Cancelled".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
