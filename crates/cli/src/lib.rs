pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use slideboard_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "slideboard",
    about = "Slideboard quote engine operator CLI",
    long_about = "Apply quote store migrations, inspect effective configuration, and run the \
                  scheduled quote expiration sweep.",
    after_help = "Examples:\n  slideboard migrate\n  slideboard config\n  \
                  slideboard sweep-expired --tenant T-1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Expire every open quote whose validity has lapsed")]
    SweepExpired {
        #[arg(long, help = "Restrict the sweep to one tenant (default: all tenants)")]
        tenant: Option<String>,
    },
}

fn init_logging(config: &AppConfig) {
    use slideboard_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // Events go to stderr so stdout stays a single JSON payload.
    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .compact()
                .init();
        }
        Pretty => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .pretty()
                .init();
        }
        Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .json()
                .init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config is reported by the command itself; logging just stays off.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::SweepExpired { tenant } => commands::sweep::run(tenant.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
