use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "windward-cli", version, about = "Windward CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Background monitor entry points
    Monitor {
        #[command(subcommand)]
        action: commands::monitor::MonitorAction,
    },
    /// Combined wind/shield/break status
    Status,
    /// Break session control
    Break {
        #[command(subcommand)]
        action: commands::breaks::BreakAction,
    },
    /// Shield state
    Shield {
        #[command(subcommand)]
        action: commands::shield::ShieldAction,
    },
    /// Companion lifecycle
    Companion {
        #[command(subcommand)]
        action: commands::companion::CompanionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Snapshot log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "windward=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Monitor { action } => commands::monitor::run(action),
        Commands::Status => commands::status::run(),
        Commands::Break { action } => commands::breaks::run(action),
        Commands::Shield { action } => commands::shield::run(action),
        Commands::Companion { action } => commands::companion::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Log { action } => commands::log::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
