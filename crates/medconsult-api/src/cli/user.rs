//! Patient CLI commands.

use anyhow::Result;
use console::style;

use medconsult_types::user::CreateUserRequest;

use crate::state::AppState;

/// Register a patient.
///
/// ```bash
/// medconsult user create --name "Ada" --email ada@example.com
/// ```
pub async fn create_user(state: &AppState, name: String, email: String, json: bool) -> Result<()> {
    let user = state
        .records
        .create_user(CreateUserRequest { name, email })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!("  {} Patient registered", style("✓").green().bold());
    println!();
    println!("  {}   {}", style("Name:").bold(), style(&user.name).cyan());
    println!("  {}  {}", style("Email:").bold(), &user.email);
    println!("  {}     {}", style("ID:").bold(), style(user.id.to_string()).dim());
    println!();
    println!(
        "  Open a consultation: {}",
        style(format!(
            "medconsult consultation create --user {} --heading \"...\"",
            user.id
        ))
        .yellow()
    );
    println!();

    Ok(())
}
