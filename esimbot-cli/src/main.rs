//! esimbot CLI - Command-line interface
//!
//! Validates activation codes, runs the download dialogue against a
//! simulated engine, and inspects the configuration.

mod commands;
mod console;
mod error;
mod runner;
mod simulated;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "esimbot")]
#[command(version, about = "Interactive eSIM profile downloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse an activation code and show its fields
    Parse {
        /// Activation code, e.g. LPA:1$smdp.example.com$ABC123
        code: String,
    },

    /// Run the download dialogue in the terminal with a simulated engine
    Simulate {
        /// Ask for a confirmation code mid-download
        #[arg(long)]
        require_code: bool,

        /// Make the engine fail when it reaches this progress step (0-10)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=10))]
        fail_at: Option<u8>,

        /// Attempt timeout in seconds (overrides config.ini)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Delay between progress steps in milliseconds
        #[arg(long, default_value_t = 300)]
        step_ms: u64,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Parse { code } => commands::parse::run(&code),
        Commands::Simulate {
            require_code,
            fail_at,
            timeout_secs,
            step_ms,
        } => commands::simulate::run(SimulateArgs {
            require_code,
            fail_at,
            timeout_secs,
            step_ms,
        }),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_simulate_flags() {
        let cli = Cli::try_parse_from([
            "esimbot",
            "simulate",
            "--require-code",
            "--fail-at",
            "4",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate {
                require_code,
                fail_at,
                timeout_secs,
                step_ms,
            } => {
                assert!(require_code);
                assert_eq!(fail_at, Some(4));
                assert_eq!(timeout_secs, Some(30));
                assert_eq!(step_ms, 300);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_fail_at_is_bounded() {
        assert!(Cli::try_parse_from(["esimbot", "simulate", "--fail-at", "11"]).is_err());
    }
}
