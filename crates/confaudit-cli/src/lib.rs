// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]

mod commands;
mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode as ProcessExitCode;

use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Generator, Shell};
use confaudit_core::{ExitCode, MachineError};

pub const CRATE_NAME: &str = "confaudit-cli";

const CONFAUDIT_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "confaudit", version)]
#[command(about = "Validate a machine snapshot against an expected configuration")]
#[command(help_template = CONFAUDIT_HELP_TEMPLATE)]
#[command(
    after_help = concat!(
        "Environment:\n",
        "  CONFAUDIT_CONFIG      Options file override\n",
        "  CONFAUDIT_LOG_LEVEL   Log filter when RUST_LOG is unset\n",
        "  CONFAUDIT_LOG_JSON    Emit logs as JSON lines",
    )
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a snapshot with an expected config and print the report.
    Validate {
        #[arg(long)]
        snapshot: PathBuf,
        /// YAML file, or a directory of YAML files merged in name order.
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        key_map: Option<PathBuf>,
        #[arg(long)]
        config_file: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        fail_on_wrong_expectation: bool,
    },
    /// Suggest snapshot paths for each expected key.
    Suggest {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_unit_interval)]
        threshold: Option<f64>,
        #[arg(long)]
        config_file: Option<PathBuf>,
    },
    /// Find snapshot leaves whose value resembles a query.
    Search {
        #[arg(long)]
        snapshot: PathBuf,
        query: String,
        #[arg(long, default_value_t = 0.45, value_parser = parse_unit_interval)]
        min_similarity: f64,
    },
    /// Report, per expected key, where its allowed values appear in a snapshot.
    MatchReport {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = 0.2, value_parser = parse_unit_interval)]
        min_similarity: f64,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write a one-row-per-key CSV summary.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print options file locations and the effective engine options.
    Config {
        #[arg(long)]
        config_file: Option<PathBuf>,
    },
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_unit_interval(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("`{raw}` must be between 0 and 1"))
    }
}

#[derive(Clone, Copy)]
pub(crate) struct LogFlags {
    pub(crate) quiet: bool,
    pub(crate) verbose: u8,
    pub(crate) trace: bool,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
    pub(crate) quiet: bool,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError {
                    exit_code: ExitCode::Usage,
                    machine: MachineError::new("usage_error", "invalid command line arguments")
                        .with_detail("error", &err.to_string()),
                });
            }
        },
    };

    let command = cli.command.ok_or_else(|| CliError {
        exit_code: ExitCode::Usage,
        machine: MachineError::new("usage_error", "missing command; see --help"),
    })?;
    logging::init_tracing(LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
    });
    let output_mode = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };

    match command {
        Commands::Validate {
            snapshot,
            config,
            key_map,
            config_file,
            out,
            fail_on_wrong_expectation,
        } => commands::run_validate(
            commands::ValidateArgs {
                snapshot,
                config,
                key_map,
                config_file,
                out,
                fail_on_wrong_expectation,
            },
            output_mode,
        ),
        Commands::Suggest {
            snapshot,
            config,
            threshold,
            config_file,
        } => commands::run_suggest(
            &snapshot,
            &config,
            threshold,
            config_file.as_deref(),
            output_mode,
        ),
        Commands::Search {
            snapshot,
            query,
            min_similarity,
        } => commands::run_search(&snapshot, &query, min_similarity, output_mode),
        Commands::MatchReport {
            snapshot,
            config,
            min_similarity,
            out,
            csv,
        } => commands::run_match_report(
            commands::MatchReportArgs {
                snapshot,
                config,
                min_similarity,
                out,
                csv,
            },
            output_mode,
        ),
        Commands::Config { config_file } => {
            commands::run_config(config_file.as_deref(), output_mode)
        }
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    }
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    pub(crate) fn input(path: &Path, message: String) -> Self {
        Self {
            exit_code: ExitCode::InputFailure,
            machine: MachineError::new("input_error", &message)
                .with_detail("path", &path.display().to_string()),
        }
    }

    pub(crate) fn config(message: String) -> Self {
        Self {
            exit_code: ExitCode::InputFailure,
            machine: MachineError::new("config_error", &message),
        }
    }

    pub(crate) fn wrong_expectation(match_percentage: u32, mismatch_ratio: f64) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new(
                "likely_wrong_expectation",
                "most checks mismatched; the expected config probably targets another machine",
            )
            .with_detail("match_percentage", &match_percentage.to_string())
            .with_detail("mismatch_ratio", &mismatch_ratio.to_string()),
        }
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\
                 \"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (key, value) in &error.machine.details {
            eprintln!("  {key}: {value}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_unit_interval, Cli};
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unit_interval_parser_bounds() {
        assert_eq!(parse_unit_interval("0.5"), Ok(0.5));
        assert_eq!(parse_unit_interval("1"), Ok(1.0));
        assert!(parse_unit_interval("1.5").is_err());
        assert!(parse_unit_interval("abc").is_err());
    }
}
