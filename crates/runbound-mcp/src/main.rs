use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use runbound_mcp::{protocol, CommandExecutor, ConfigLoader, RunboundMcp, ServerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "runbound")]
#[command(about = "Run shell commands with a deadline and an output ceiling, over MCP or directly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (defaults to <config_dir>/runbound/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); logs go to stderr
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Shell executable used to run commands
    #[arg(long, global = true)]
    shell: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start MCP stdio server (default)
    Serve,

    /// Run one command and print the outcome as JSON
    Exec(ExecArgs),
}

#[derive(Args, Debug)]
struct ExecArgs {
    /// Command line passed to the shell
    #[arg(value_name = "COMMAND")]
    command: String,

    /// Working directory
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Wall-clock timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Byte ceiling per output stream
    #[arg(long)]
    max_output_bytes: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config)?;

    let executor = CommandExecutor::from_config(&config);
    info!(
        shell = %executor.shell().program(),
        default_timeout_ms = config.default_timeout_ms,
        default_max_output_bytes = config.default_max_output_bytes,
        "runbound starting"
    );

    match cli.command {
        None | Some(Command::Serve) => {
            protocol::serve_stdio(RunboundMcp::new(executor)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Exec(args)) => run_exec(&executor, args).await,
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader
        .load()
        .with_context(|| format!("loading {}", loader.config_path().display()))?;

    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(shell) = &cli.shell {
        config.shell = Some(shell.clone());
    }

    config.validated().context("invalid configuration")
}

fn init_logging(config: &ServerConfig) -> Result<()> {
    use tracing_subscriber::fmt;

    let level = config.parse_log_level()?;

    // stdout carries the protocol
    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn run_exec(executor: &CommandExecutor, args: ExecArgs) -> Result<ExitCode> {
    let outcome = executor
        .execute(
            &args.command,
            args.cwd.as_deref(),
            args.timeout_ms,
            args.max_output_bytes,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.is_error() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
