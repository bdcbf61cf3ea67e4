// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! shade - control CLI for the shade idle/lock manager daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use shade_core::ModuleSpec;
use shade_wire::Request;

use crate::exit_error::ExitError;

#[derive(Parser)]
#[command(name = "shade", version, about = "Idle and lock-screen manager")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the shade daemon and attach the current session
    Start,
    /// Stop the shade daemon
    Stop,
    /// Print the daemon's current status
    Status,
    /// Reload the configuration
    Reload,
    /// Lock the session now
    Lock {
        /// Block until the session is unlocked again
        #[arg(long)]
        wait: bool,
    },
    /// Unlock the session now
    Unlock,
    /// Attach a session (defaults to the current one)
    Attach {
        /// Session spec words, e.g. `session.x11 :0`
        session: Vec<String>,
    },
    /// Detach a session (defaults to the current one)
    Detach {
        /// Session spec words, e.g. `session.x11 :0`
        session: Vec<String>,
    },
    /// Send a command to a module instance inside the daemon
    #[command(hide = true)]
    Module {
        /// Module spec words, then `--`, then the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start().await,
        Command::Stop => commands::stop().await,
        Command::Status => commands::simple(Request::Status).await,
        Command::Reload => commands::simple(Request::Reload).await,
        Command::Lock { wait } => commands::simple(Request::Lock { wait }).await,
        Command::Unlock => commands::simple(Request::Unlock).await,
        Command::Attach { session } => {
            commands::attach_or_detach(true, parse_session(session)).await
        }
        Command::Detach { session } => {
            commands::attach_or_detach(false, parse_session(session)).await
        }
        Command::Module { words } => commands::module(words).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("shade: {e:#}");
            let code = e.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
            std::process::ExitCode::from(code)
        }
    }
}

fn parse_session(words: Vec<String>) -> Option<ModuleSpec> {
    ModuleSpec::from_words(&words).ok()
}
