//! Consultation CLI commands: create, list, ask, timeline, and the manual
//! memory triggers.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

use medconsult_types::consultation::CreateConsultationRequest;
use medconsult_types::memory::{ConsolidationOutcome, ReconciliationOutcome};
use medconsult_types::turn::TurnOutcome;

use crate::cli::{format_relative_time, truncate};
use crate::state::AppState;

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(spinner)
}

/// Open a consultation for a patient.
pub async fn create_consultation(
    state: &AppState,
    user_id: &Uuid,
    heading: String,
    reference: Option<Uuid>,
    json: bool,
) -> Result<()> {
    let consultation = state
        .records
        .create_consultation(user_id, CreateConsultationRequest { heading, reference })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&consultation)?);
        return Ok(());
    }

    println!();
    println!("  {} Consultation opened", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Heading:").bold(), style(&consultation.heading).cyan());
    if let Some(reference) = consultation.reference {
        println!("  {}  {}", style("Follows:").bold(), style(reference.to_string()).dim());
    }
    println!("  {}       {}", style("ID:").bold(), style(consultation.id.to_string()).dim());
    println!();
    println!(
        "  Ask a question: {}",
        style(format!(
            "medconsult ask --consultation {} \"...\"",
            consultation.id
        ))
        .yellow()
    );
    println!();

    Ok(())
}

/// List the patient's most recently active consultations.
pub async fn list_consultations(
    state: &AppState,
    user_id: &Uuid,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let consultations = state.records.list_consultations(user_id, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&consultations)?);
        return Ok(());
    }

    if consultations.is_empty() {
        println!();
        println!(
            "  {} No consultations yet. Open one with: {}",
            style("i").blue().bold(),
            style(format!("medconsult consultation create --user {user_id} --heading \"...\"")).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Heading").fg(Color::White),
        Cell::new("Summary").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for c in &consultations {
        let summary = if c.summary.trim().is_empty() {
            Cell::new("(not summarized yet)").fg(Color::DarkGrey)
        } else {
            Cell::new(truncate(&c.summary, 60))
        };
        table.add_row(vec![
            Cell::new(&c.heading).fg(Color::Cyan),
            summary,
            Cell::new(format_relative_time(&c.updated_at)).fg(Color::DarkGrey),
            Cell::new(c.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

/// Run one consultation turn and print the reply plus any side-effect failures.
pub async fn ask(state: &AppState, consultation_id: &Uuid, query: &str, json: bool) -> Result<()> {
    let progress = (!json).then(|| spinner("Consulting...")).transpose()?;
    let outcome = state.consultations.handle_turn(None, consultation_id, query).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_turn(&outcome);
    Ok(())
}

fn print_turn(outcome: &TurnOutcome) {
    println!();
    println!("{}", outcome.turn.response);
    println!();

    if !outcome.turn.records.is_empty() {
        println!(
            "  {} {} historical record{} used",
            style("↳").dim(),
            outcome.turn.records.len(),
            if outcome.turn.records.len() == 1 { "" } else { "s" }
        );
    }
    if let Some(ReconciliationOutcome::Completed(report)) = &outcome.side_effects.reconciliation {
        println!(
            "  {} conditions: {} added, {} updated",
            style("↳").dim(),
            report.added.len(),
            report.updated.len()
        );
    }
    if let Some(ConsolidationOutcome::Updated { entries_summarized, .. }) =
        &outcome.side_effects.consolidation
    {
        println!(
            "  {} summary updated from {} turn{}",
            style("↳").dim(),
            entries_summarized,
            if *entries_summarized == 1 { "" } else { "s" }
        );
    }
    for err in &outcome.side_effects.errors {
        println!(
            "  {} {} failed: {}",
            style("!").yellow().bold(),
            err.stage,
            style(&err.message).dim()
        );
    }
    println!();
}

/// Print the consultation timeline as a table, oldest first.
pub async fn timeline(state: &AppState, consultation_id: &Uuid, json: bool) -> Result<()> {
    let entries = state.records.timeline(consultation_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  {} No turns in this consultation yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Question").fg(Color::White),
        Cell::new("Response").fg(Color::White),
        Cell::new("Insight").fg(Color::White),
    ]);

    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&entry.user_query, 40)).fg(Color::Cyan),
            Cell::new(truncate(&entry.model_response, 60)),
            Cell::new(truncate(entry.insights.as_deref().unwrap_or("-"), 40)).fg(Color::Green),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} turn{}",
        style(entries.len()).bold(),
        if entries.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Manually trigger summary consolidation.
pub async fn consolidate(state: &AppState, consultation_id: &Uuid, json: bool) -> Result<()> {
    let outcome = state.consultations.consolidate(consultation_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    match outcome {
        ConsolidationOutcome::UpToDate { pending, threshold } => {
            println!(
                "  {} Summary up to date ({pending}/{threshold} new turns pending)",
                style("i").blue().bold()
            );
        }
        ConsolidationOutcome::Updated {
            summary,
            entries_summarized,
        } => {
            println!(
                "  {} Summary updated from {entries_summarized} turns",
                style("✓").green().bold()
            );
            println!();
            println!("{summary}");
        }
    }
    println!();

    Ok(())
}

/// Manually trigger condition reconciliation.
pub async fn reconcile(state: &AppState, consultation_id: &Uuid, json: bool) -> Result<()> {
    let progress = (!json).then(|| spinner("Reconciling conditions...")).transpose()?;
    let outcome = state.consultations.reconcile(consultation_id).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let outcome = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    match outcome {
        ReconciliationOutcome::NotDue { pending, threshold } => {
            println!(
                "  {} Not due ({pending}/{threshold} new turns since last check)",
                style("i").blue().bold()
            );
        }
        ReconciliationOutcome::Completed(report) => {
            println!("  {} Conditions reconciled", style("✓").green().bold());
            for c in &report.added {
                println!("    {} {} ({})", style("+").green(), c.condition_name, c.condition_type);
            }
            for c in &report.updated {
                let state = if c.is_active { "active" } else { "resolved" };
                println!("    {} {} ({state})", style("~").yellow(), c.condition_name);
            }
            if report.ignored > 0 {
                println!("    {} {} ignored", style("·").dim(), report.ignored);
            }
            for err in &report.errors {
                println!(
                    "    {} {} '{}': {}",
                    style("!").red().bold(),
                    err.mode,
                    err.condition_name,
                    style(&err.message).dim()
                );
            }
        }
    }
    println!();

    Ok(())
}
