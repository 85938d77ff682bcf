//! Flag overrides on top of the layered `edged_config::Config`.
//!
//! Precedence, lowest first: built-in defaults, config file, `EDGED_*__*`
//! environment, command-line flags (and their flat `EDGED_*` env vars).

use std::time::Duration;

use edged_config::{Config, load_config};

use crate::cli::{Command, DocumentArgs, GlobalOpts, RunArgs};
use crate::error::CliError;

/// Load the config file and apply global and per-command flags.
pub fn resolve(global: &GlobalOpts, command: &Command) -> Result<Config, CliError> {
    let mut config = load_config(global.config.as_deref())?;
    apply_global(&mut config, global);
    match command {
        Command::Run(args) => apply_run(&mut config, args)?,
        Command::Reconcile(args) | Command::Diff(args) => apply_document(&mut config, args),
        _ => {}
    }
    Ok(config)
}

fn apply_global(config: &mut Config, global: &GlobalOpts) {
    // An explicit URL means TCP, whatever socket the config file names.
    if let Some(url) = &global.local_api {
        config.local_api.url.clone_from(url);
        config.local_api.socket = None;
    }
    if let Some(socket) = &global.socket {
        config.local_api.socket = Some(socket.clone());
    }
    if let Some(token) = &global.local_api_token {
        config.local_api.token = Some(token.clone());
    }
    if let Some(timeout) = global.timeout {
        config.local_api.timeout_secs = timeout;
    }
}

fn apply_document(config: &mut Config, args: &DocumentArgs) {
    if let Some(path) = &args.prefs_file {
        config.agent.prefs_file.clone_from(path);
    }
}

fn apply_run(config: &mut Config, args: &RunArgs) -> Result<(), CliError> {
    apply_document(config, &args.document);
    if let Some(tick) = args.tick {
        config.agent.tick_secs = whole_seconds("--tick", tick)?;
    }
    if let Some(timeout) = args.apply_timeout {
        config.agent.apply_timeout_secs = whole_seconds("--apply-timeout", timeout)?;
    }
    if let Some(path) = &args.cli_path {
        config.agent.cli_path.clone_from(path);
    }
    if args.no_watch {
        config.agent.watch = false;
    }
    if let Some(path) = &args.log_file {
        config.log.file = Some(path.clone());
    }
    if args.log_json {
        config.log.json = true;
    }
    Ok(())
}

fn whole_seconds(flag: &str, value: Duration) -> Result<u64, CliError> {
    if value.subsec_nanos() != 0 || value.is_zero() {
        return Err(CliError::Validation {
            field: flag.into(),
            reason: format!(
                "expected a whole number of seconds, got {}",
                humantime::format_duration(value)
            ),
        });
    }
    Ok(value.as_secs())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid args")
    }

    #[test]
    fn run_flags_override_config() {
        let cli = parse(&[
            "edged",
            "--local-api",
            "http://127.0.0.1:9000",
            "run",
            "--tick",
            "15s",
            "--prefs-file",
            "/srv/prefs.yaml",
            "--no-watch",
        ]);
        let mut config = Config::default();
        apply_global(&mut config, &cli.global);
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        apply_run(&mut config, args).expect("valid overrides");

        assert_eq!(config.local_api.url, "http://127.0.0.1:9000");
        assert_eq!(config.local_api.socket, None);
        assert_eq!(config.agent.tick_secs, 15);
        assert_eq!(config.agent.prefs_file, PathBuf::from("/srv/prefs.yaml"));
        assert!(!config.agent.watch);
    }

    #[test]
    fn sub_second_tick_is_rejected() {
        let cli = parse(&["edged", "run", "--tick", "500ms"]);
        let Command::Run(args) = &cli.command else {
            panic!("expected run");
        };
        let err = apply_run(&mut Config::default(), args).expect_err("sub-second");
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "--tick"));
    }

    #[test]
    fn socket_flag_selects_unix_transport() {
        let cli = parse(&["edged", "--socket", "/run/ts/tailscaled.sock", "status"]);
        let mut config = Config::default();
        config.local_api.socket = None;
        apply_global(&mut config, &cli.global);

        let transport = config.transport().expect("valid transport");
        assert_eq!(transport.socket, Some(PathBuf::from("/run/ts/tailscaled.sock")));
        assert_eq!(config.endpoint(), "unix:/run/ts/tailscaled.sock");
    }

    #[test]
    fn socket_and_local_api_conflict() {
        let err = Cli::try_parse_from([
            "edged",
            "--socket",
            "/run/ts/tailscaled.sock",
            "--local-api",
            "http://127.0.0.1:9000",
            "status",
        ])
        .expect_err("conflicting transports");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
