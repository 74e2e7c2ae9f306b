//! Condition CLI commands.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use medconsult_types::condition::ConditionType;

use crate::cli::{format_relative_time, truncate};
use crate::state::AppState;

/// List a patient's conditions in a table, oldest first.
pub async fn list_conditions(state: &AppState, user_id: &Uuid, active_only: bool, json: bool) -> Result<()> {
    let conditions = state.records.list_conditions(user_id, active_only).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conditions)?);
        return Ok(());
    }

    if conditions.is_empty() {
        println!();
        println!(
            "  {} No {}conditions recorded yet.",
            style("i").blue().bold(),
            if active_only { "active " } else { "" }
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("ICD").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Notes").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for condition in &conditions {
        let type_cell = match condition.condition_type {
            ConditionType::Condition => Cell::new("condition").fg(Color::Cyan),
            ConditionType::Symptom => Cell::new("symptom").fg(Color::Yellow),
            ConditionType::Adr => Cell::new("adr").fg(Color::Magenta),
        };
        let status_cell = if condition.is_active {
            Cell::new("● active").fg(Color::Green)
        } else {
            Cell::new("○ resolved").fg(Color::DarkGrey)
        };

        table.add_row(vec![
            Cell::new(&condition.condition_name).fg(Color::Cyan),
            type_cell,
            Cell::new(condition.icd_code.as_deref().unwrap_or("-")),
            status_cell,
            Cell::new(truncate(&condition.notes, 50)),
            Cell::new(format_relative_time(&condition.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} condition{}",
        style(conditions.len()).bold(),
        if conditions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
