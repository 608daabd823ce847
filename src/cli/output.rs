//! CLI output formatting

use crate::{
    core::{StageFailure, StageSnapshot, StageStatus},
    execution::WorkflowEvent,
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");

/// Format a stage status for display
pub fn format_status(status: StageStatus) -> String {
    match status {
        StageStatus::Valid => style("VALID").green().to_string(),
        StageStatus::Updating => style("UPDATING").yellow().to_string(),
        StageStatus::Invalid => style("INVALID").red().to_string(),
    }
}

/// Format a computation failure for the operator
pub fn format_failure(failure: &StageFailure) -> String {
    format!(
        "{} {} failed: {}",
        WARN,
        style(&failure.operation).yellow(),
        style(&failure.message).dim()
    )
}

/// One line per stage
pub fn format_stage(snapshot: &StageSnapshot) -> String {
    let icon = match snapshot.status {
        StageStatus::Valid => CHECK,
        StageStatus::Updating => SPINNER,
        StageStatus::Invalid => CROSS,
    };

    let mut line = format!(
        "{} {} [{}] {} - {} event(s), channels: {}",
        icon,
        style(&snapshot.name).bold(),
        style(&snapshot.kind).dim(),
        format_status(snapshot.status),
        snapshot.events,
        if snapshot.channels.is_empty() {
            "-".to_string()
        } else {
            snapshot.channels.join(", ")
        }
    );

    if !snapshot.views.is_empty() {
        let views: Vec<String> = snapshot
            .views
            .iter()
            .map(|v| match &v.channel {
                Some(channel) => format!("{}({})", v.kind, channel),
                None => v.kind.clone(),
            })
            .collect();
        line.push_str(&format!("\n    views: {}", views.join(", ")));
    }

    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!("\n    last error: {}", style(error).red()));
    }

    line
}

/// Format a workflow event for verbose display; `None` for noise
pub fn format_event(event: &WorkflowEvent) -> Option<String> {
    match event {
        WorkflowEvent::ResultUpdated {
            stage,
            version,
            events,
        } => Some(format!(
            "{} {} recomputed (v{}, {} event(s))",
            INFO,
            style(stage).cyan(),
            version,
            events
        )),
        WorkflowEvent::ValidationRejected { stage } => Some(format!(
            "{} {} is not ready",
            INFO,
            style(stage).yellow()
        )),
        WorkflowEvent::Invalidated { stage, by } => Some(format!(
            "{} {} invalidated by {}",
            INFO,
            style(stage).yellow(),
            style(by).dim()
        )),
        WorkflowEvent::ComputationFailed(failure) => Some(format_failure(failure)),
        WorkflowEvent::CycleStarted { .. } | WorkflowEvent::StatusChanged { .. } => None,
    }
}
