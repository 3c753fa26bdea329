mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, HistoryWindow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Ingest(args) => commands::ingest::run(args).await,
        Commands::Report { id, json } => commands::report::run(id.as_deref(), json).await,
        Commands::History {
            query,
            from,
            to,
            today,
            week,
            month,
            stats,
        } => {
            let window = if today {
                Some(HistoryWindow::Today)
            } else if week {
                Some(HistoryWindow::Week)
            } else if month {
                Some(HistoryWindow::Month)
            } else {
                None
            };
            commands::history::run(query.as_deref().unwrap_or(""), from, to, window, stats).await
        }
        Commands::Delete { id } => commands::delete::run(&id).await,
        Commands::Cleanup => commands::cleanup::run().await,
        Commands::Compare {
            baseline,
            candidate,
        } => commands::compare::run(&baseline, &candidate).await,
        Commands::Orphans => commands::orphans::run().await,
        Commands::Insights { url, offline } => commands::insights::run(&url, offline).await,
        Commands::Version => commands::version::run(),
    }
}
