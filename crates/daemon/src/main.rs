// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! shade daemon (shaded)
//!
//! Background process that owns the engine loop.
//!
//! Architecture:
//! - Worker tasks (socket accept, helper readers, timers, bus readers)
//!   only enqueue events
//! - Engine loop: main task processing events sequentially

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod control;
mod env;
mod lifecycle;
mod modules;
mod supervisor;

use shade_core::SystemClock;
use shade_engine::{channel, Configurator, Engine, Event, EventReader};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::lifecycle::{Config, DaemonGuard, LifecycleError};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("shaded {}", env!("CARGO_PKG_VERSION"));
                return std::process::ExitCode::SUCCESS;
            }
            "--help" | "-h" | "help" => {
                println!("shaded {}", env!("CARGO_PKG_VERSION"));
                println!("shade daemon - reacts to user-session idleness");
                println!();
                println!("USAGE:");
                println!("    shaded");
                println!();
                println!("The daemon is normally started by `shade start` and should not");
                println!("be invoked directly. It listens on a Unix socket for commands");
                println!("from `shade`.");
                return std::process::ExitCode::SUCCESS;
            }
            other => {
                eprintln!("error: unexpected argument {other:?}");
                eprintln!("Usage: shaded [--help | --version]");
                return std::process::ExitCode::from(2);
            }
        }
    }

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("shaded: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    let _log_guard = setup_logging(&config)?;

    let guard = match DaemonGuard::acquire(&config) {
        Ok(guard) => guard,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
            let pid = pid.trim();
            if pid.is_empty() {
                return Err("shaded is already running".into());
            }
            return Err(format!("shaded is already running (pid {pid})").into());
        }
        Err(e) => return Err(e.into()),
    };

    info!("starting daemon");

    // Load the user configuration. A missing file is a warning; a broken
    // one is a startup failure the user should see.
    let loaded = match shade_config::find_config() {
        Ok(Some(loaded)) => Some(loaded),
        Ok(None) => {
            warn!("no configuration file found; running with no user modules");
            None
        }
        Err(e) => return Err(format!("configuration error: {e}").into()),
    };

    let (events, rx) = channel();
    let mut engine = Engine::new(
        modules::builtin_registry(),
        Configurator::new(loaded),
        events,
        config.engine_paths(),
        SystemClock,
    );

    // Start on-boot modules. Failing to come up (most importantly the
    // control socket) is fatal at startup.
    if let Err(e) = engine.update().await {
        guard.shutdown();
        return Err(format!("startup reconciliation failed: {e}").into());
    }

    info!(socket = %config.socket_path.display(), "daemon ready");

    // Signal readiness to the CLI waiting on our stdout.
    println!("READY");

    run_loop(&mut engine, rx).await;

    guard.shutdown();
    info!("daemon stopped");
    Ok(())
}

/// The engine loop: drain events and signals until a stop request, then
/// keep draining what is already queued so workers wind down cleanly.
async fn run_loop(engine: &mut Engine<SystemClock>, mut rx: EventReader) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };
    let mut sighup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGHUP handler: {}", e);
            return;
        }
    };

    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => return,
            },
            _ = sigterm.recv() => {
                info!("got SIGTERM, requesting stop");
                Event::Stop
            }
            _ = sigint.recv() => {
                info!("got SIGINT, requesting stop");
                Event::Stop
            }
            _ = sighup.recv() => {
                info!("got SIGHUP, requesting reload");
                Event::Reload
            }
        };

        match event {
            Event::Stop => {
                if let Err(e) = engine.shutdown().await {
                    error!("error during shutdown reconciliation: {}", e);
                }
                // Stopping: drain remaining events, then exit.
                while let Ok(event) = rx.try_recv() {
                    dispatch(engine, event).await;
                }
                return;
            }
            other => dispatch(engine, other).await,
        }
    }
}

async fn dispatch(engine: &mut Engine<SystemClock>, event: Event) {
    match event {
        Event::Control { request, reply } => control::handle(engine, request, reply).await,
        Event::Stop => {} // Already stopping.
        other => {
            // One bad handler must not kill the daemon.
            if let Err(e) = engine.handle_event(other).await {
                error!("error handling event: {}", e);
            }
        }
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures must not keep the daemon from starting.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        &config.run_dir,
        config
            .log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("daemon.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_env("SHADE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
