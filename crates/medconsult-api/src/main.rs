//! MedConsult CLI and REST API entry point.
//!
//! Binary name: `medconsult`
//!
//! Parses CLI arguments, initializes tracing, the database, and services,
//! then dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;

use medconsult_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};

use cli::{Cli, Commands, ConsultationCommand, UserCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(verbosity_filter(cli.quiet, cli.verbose), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let json = cli.json;

    match cli.command {
        Commands::Serve { host, port } => serve(state, &host, port).await?,

        Commands::User { action } => match action {
            UserCommand::Create { name, email } => {
                cli::user::create_user(&state, name, email, json).await?;
            }
        },

        Commands::Consultation { action } => match action {
            ConsultationCommand::Create {
                user,
                heading,
                reference,
            } => {
                cli::consultation::create_consultation(&state, &user, heading, reference, json)
                    .await?;
            }
            ConsultationCommand::List { user, limit } => {
                cli::consultation::list_consultations(&state, &user, limit, json).await?;
            }
        },

        Commands::Ask {
            consultation,
            query,
        } => {
            cli::consultation::ask(&state, &consultation, &query, json).await?;
        }

        Commands::Timeline { consultation_id } => {
            cli::consultation::timeline(&state, &consultation_id, json).await?;
        }

        Commands::Consolidate { consultation_id } => {
            cli::consultation::consolidate(&state, &consultation_id, json).await?;
        }

        Commands::Reconcile { consultation_id } => {
            cli::consultation::reconcile(&state, &consultation_id, json).await?;
        }

        Commands::Conditions { user, active } => {
            cli::condition::list_conditions(&state, &user, active, json).await?;
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} MedConsult API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {} data dir {}",
        console::style("·").dim(),
        console::style(state.data_dir.display()).dim()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
