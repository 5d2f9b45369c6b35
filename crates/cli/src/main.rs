use anyhow::Context;
use bookshelf_app::App;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operator entrypoint for the bookshelf service.
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default configuration from `config/` and the environment)
    Serve,
    /// Print the effective settings as JSON with credentials masked
    Settings,
    /// Create the document store indexes and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load bookshelf settings")?;

    match cli.command {
        Command::Settings => {
            let json = serde_json::to_string_pretty(&settings.redacted())
                .context("failed to render settings")?;
            println!("{json}");
            Ok(())
        }
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::run(settings).await
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let app = App::build(settings).await?;
            let applied = app.migrate().await?;
            tracing::info!(applied, "migrations complete");
            Ok(())
        }
    }
}
