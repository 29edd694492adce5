pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gearmatch_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use commands::evaluate::EvaluateArgs;
use commands::select::SelectArgs;

#[derive(Debug, Parser)]
#[command(
    name = "gearmatch",
    about = "Gearbox, coupling and pump selection CLI",
    long_about = "Select marine gearboxes with matching couplings and standby pumps from a catalog, \
                  evaluate single models, and inspect configuration readiness.",
    after_help = "Examples:\n  gearmatch select --power 1000 --speed 1500 --ratio 3.0\n  \
                  gearmatch select --power 1000 --speed 1500 --ratio 3.0 --family HC --duty IV --cover\n  \
                  gearmatch evaluate --family HC --model HC1000 --power 1000 --speed 1500 --ratio 3.0\n  \
                  gearmatch doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to gearmatch.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Select the best gearbox (and accessories) for the given requirements")]
    Select(SelectArgs),
    #[command(about = "Score one catalog model against the given requirements")]
    Evaluate(EvaluateArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, catalog and reference table loading")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(config: &AppConfig) {
    use gearmatch_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // stdout carries command output
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    if let Ok(config) = AppConfig::load(LoadOptions {
        config_path: config_path.map(PathBuf::from),
        require_file: false,
        overrides: ConfigOverrides::default(),
    }) {
        init_logging(&config);
    }

    let result = match &cli.command {
        Command::Select(args) => commands::select::run(config_path, args),
        Command::Evaluate(args) => commands::evaluate::run(config_path, args),
        Command::Config => commands::config::run(config_path),
        Command::Doctor { json } => commands::doctor::run(config_path, *json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
