use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalogue service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the resolved configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render configuration")?;
            println!("{rendered}");
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let applied = bookshelf_app::migrate(&settings).await?;
            tracing::info!(applied, "migrate finished");
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::serve(settings).await?;
        }
    }

    Ok(())
}
