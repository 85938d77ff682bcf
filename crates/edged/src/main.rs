mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::Layered};

use edged_config::LogSettings;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for command output; `log.file` adds a non-blocking file writer whose
/// guard must outlive the command.
fn init_tracing(
    verbosity: u8,
    quiet: bool,
    log: &LogSettings,
) -> Result<Option<WorkerGuard>, CliError> {
    let level = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    layers.push(if log.json {
        stderr.json().boxed()
    } else {
        stderr.boxed()
    });

    let mut guard = None;
    if let Some(path) = &log.file {
        let file_name = path.file_name().ok_or_else(|| CliError::Validation {
            field: "log.file".into(),
            reason: format!("not a file path: {}", path.display()),
        })?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let (writer, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        let file = fmt::layer().with_writer(writer).with_ansi(false);
        layers.push(if log.json {
            file.json().boxed()
        } else {
            file.boxed()
        });
        guard = Some(file_guard);
    }

    tracing_subscriber::registry().with(filter).with(layers).init();
    Ok(guard)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Completions(args) = &cli.command {
        use clap::CommandFactory;
        use clap_complete::generate;

        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "edged", &mut std::io::stdout());
        return Ok(());
    }

    let config = config::resolve(&cli.global, &cli.command)?;
    let _guard = init_tracing(cli.global.verbose, cli.global.quiet, &config.log)?;

    let ctx = Context::new(config)?;
    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, ctx, &cli.global).await
}
