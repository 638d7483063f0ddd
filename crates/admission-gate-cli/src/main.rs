// admission-gate-cli/src/main.rs
// ============================================================================
// Module: Admission Gate CLI Entry Point
// Description: Command dispatcher for the admission gate server and tooling.
// Purpose: Run the HTTP gate and inspect config, policy, and sanitizer output.
// Dependencies: clap, admission-gate-config, admission-gate-core, admission-gate-server, tokio
// ============================================================================

//! ## Overview
//! `admission-gate serve` runs the HTTP gate. The remaining commands are
//! offline helpers: they load the same configuration file and print the
//! policy header, a sanitizer verdict, or an audit fingerprint without
//! contacting the completion upstream.
//!
//! Security posture: command arguments are untrusted text and pass through
//! the same sanitizer the server uses.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use admission_gate_config::GateConfig;
use admission_gate_config::config_toml_example;
use admission_gate_core::Fingerprint;
use admission_gate_core::InputSanitizer;
use admission_gate_core::ValidationResult;
use admission_gate_core::build_policy;
use admission_gate_core::policy_header_name;
use admission_gate_core::policy_header_value;
use admission_gate_server::GateServer;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "admission-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the admission gate HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Content-Security-Policy utilities.
    Policy {
        /// Selected policy subcommand.
        #[command(subcommand)]
        command: PolicyCommand,
    },
    /// Print the audit fingerprint of a text.
    Fingerprint(FingerprintCommand),
    /// Run the sanitizer on a text and print the verdict as JSON.
    Sanitize(SanitizeCommand),
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to admission-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force the production policy regardless of config.
    #[arg(long, action = ArgAction::SetTrue)]
    production: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an admission gate configuration file.
    Check(ConfigCheckCommand),
    /// Print a complete configuration file with default values.
    Example,
}

/// Arguments for `config check`.
#[derive(Args, Debug)]
struct ConfigCheckCommand {
    /// Optional config file path (defaults to admission-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Policy subcommands.
#[derive(Subcommand, Debug)]
enum PolicyCommand {
    /// Print the policy header the server would send.
    Print(PolicyPrintCommand),
}

/// Arguments for `policy print`.
#[derive(Args, Debug)]
struct PolicyPrintCommand {
    /// Optional config file path (defaults to admission-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Render the production policy regardless of config.
    #[arg(long, action = ArgAction::SetTrue)]
    production: bool,
    /// Prefix the value with the header name.
    #[arg(long, action = ArgAction::SetTrue)]
    with_name: bool,
}

/// Arguments for `fingerprint`.
#[derive(Args, Debug)]
struct FingerprintCommand {
    /// Text to fingerprint.
    #[arg(value_name = "TEXT")]
    text: String,
}

/// Arguments for `sanitize`.
#[derive(Args, Debug)]
struct SanitizeCommand {
    /// Optional config file path (defaults to admission-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Text to sanitize.
    #[arg(value_name = "TEXT")]
    text: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("admission-gate {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Policy {
            command,
        } => match command {
            PolicyCommand::Print(command) => command_policy_print(&command),
        },
        Commands::Fingerprint(command) => command_fingerprint(&command),
        Commands::Sanitize(command) => command_sanitize(&command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), command.production)?;
    let server = GateServer::from_config(config)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check(command) => command_config_check(&command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_check(command: &ConfigCheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), false)?;
    let mode = if config.server.production { "production" } else { "development" };
    write_stdout_line(&format!(
        "config ok: bind {}, {mode} mode, daily limit {}",
        config.server.bind, config.quota.daily_limit
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Policy Commands
// ============================================================================

/// Executes `policy print`.
fn command_policy_print(command: &PolicyPrintCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), command.production)?;
    write_stdout_line(&render_policy(&config, command.with_name))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Renders the policy header for `config`, optionally prefixed by its name.
fn render_policy(config: &GateConfig, with_name: bool) -> String {
    let directives = build_policy(&config.policy.directives(), config.server.production);
    let value = policy_header_value(&directives);
    if with_name {
        format!("{}: {value}", policy_header_name(config.policy.report_only))
    } else {
        value
    }
}

// ============================================================================
// SECTION: Sanitizer Commands
// ============================================================================

/// Executes `fingerprint`.
fn command_fingerprint(command: &FingerprintCommand) -> CliResult<ExitCode> {
    write_stdout_line(Fingerprint::of(&command.text).as_str())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `sanitize`; rejected input exits with failure after printing
/// the verdict.
fn command_sanitize(command: &SanitizeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref(), false)?;
    let verdict = sanitize_verdict(&config, &command.text)?;
    let json = serde_json::to_string(&verdict)
        .map_err(|err| CliError::new(format!("failed to encode verdict: {err}")))?;
    write_stdout_line(&json).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(if verdict.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Runs the sanitizer with the configured constraints.
fn sanitize_verdict(config: &GateConfig, text: &str) -> CliResult<ValidationResult> {
    let constraints = config
        .sanitize_constraints()
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    let sanitizer = InputSanitizer::new()
        .map_err(|err| CliError::new(format!("sanitizer init failed: {err}")))?;
    Ok(sanitizer.validate(Some(text), &constraints))
}

// ============================================================================
// SECTION: Config Loading
// ============================================================================

/// Loads configuration and applies the `--production` flag.
///
/// The flag only ever switches production on; it never relaxes a config or
/// environment that already selects production.
fn load_config(path: Option<&Path>, production: bool) -> CliResult<GateConfig> {
    let mut config = GateConfig::load(path)
        .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    if production {
        config.server.production = true;
    }
    Ok(config)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr().lock();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
