#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `nakatani` command line: research sessions against the simulated pen and
//! protocol helpers for captured frames.

mod cli;
mod error_fmt;
mod research;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use nakatani_config::{Config, Logging};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hook: {e}");
    }

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            let code = error_fmt::exit_code_for_error(&err);
            tracing::error!(error = %err, code, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            code
        }
    };
    std::process::exit(code);
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(p) => nakatani_config::load_file(p),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            nakatani_config::load_file(Path::new(DEFAULT_CONFIG))
        }
        None => Ok(Config::default()),
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    // Protocol helpers work without a config file.
    match &cli.cmd {
        Commands::Decode { frames } => {
            let _guard = init_tracing(cli.json, &cli.log_level, &Logging::default())?;
            let malformed = research::decode_frames(frames, cli.json);
            if malformed > 0 {
                eyre::bail!("{malformed} of {} frames could not be decoded", frames.len());
            }
            return Ok(());
        }
        Commands::Command { name } => {
            let _guard = init_tracing(cli.json, &cli.log_level, &Logging::default())?;
            return research::print_command(name, cli.json);
        }
        Commands::Research { .. } | Commands::SelfCheck => {}
    }

    let cfg = load_config(cli.config.as_deref())?;
    // Held until the command finishes so the file writer flushes before exit.
    let _guard = init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Research {
            object,
            require_pen_lift,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("install Ctrl-C handler")?;
            }
            let object = object.map_or(cfg.research.object, Into::into);
            let outcome =
                research::run_research(&cfg, object, require_pen_lift, cli.json, shutdown)?;
            research::print_outcome(&outcome, cli.json);
        }
        Commands::SelfCheck => {
            let points = research::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok", "points": points }));
            } else {
                println!("OK: codec verified, {points} points configured");
            }
        }
        Commands::Decode { .. } | Commands::Command { .. } => {}
    }
    Ok(())
}

/// Console logs go to stderr so stdout stays machine-readable.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> eyre::Result<Option<WorkerGuard>> {
    let level = logging.level.as_deref().filter(|_| level == "info").unwrap_or(level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let mut layers = Vec::new();
    let mut guard = None;
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        layers.push(fmt::layer().json().with_ansi(false).with_writer(writer).boxed());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}
