// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin module implementations and their registry.

mod backlight;
mod bus_client;
mod bus_server;
mod dpms;
mod dunst;
mod locker;
mod logind;
mod power;
mod remote;
mod server;
mod session;
#[cfg(test)]
pub(crate) mod test_cx;
mod timer;
mod tty_idle;
mod upower;
mod xkbmap;
mod xset;
mod xss;

use shade_core::{ModuleSpec, UserError};
use shade_engine::{names, LockModule, ModuleError, PerSessionLauncher, Registry};

pub(crate) use server::ServerModule;

use backlight::BacklightModule;
use bus_client::BusClientModule;
use bus_server::BusServerModule;
use dpms::DpmsSessionModule;
use dunst::DunstModule;
use locker::LockerModule;
use logind::LogindModule;
use power::PowerModule;
use remote::{RemoteReceiverModule, RemoteSenderModule};
use session::{RemoteSession, TtySession, X11Session};
use timer::TimerModule;
use tty_idle::TtyWatch;
use upower::UpowerModule;
use xkbmap::XkbmapModule;
use xset::XsetModule;
use xss::XssBridge;

/// Per-X11-session display power helper.
const DPMS_SESSION: &str = "dpms.session";

fn user_err(e: ModuleError) -> UserError {
    UserError::new(e.to_string())
}

fn session_arg(spec: &ModuleSpec) -> Result<&str, UserError> {
    spec.arg(0)
        .ok_or_else(|| UserError::new(format!("Session spec {} needs an identity", spec)))
}

/// The full builtin module set, keyed by name.
pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register(names::SERVER, |_| Ok(Box::new(ServerModule::default())));

    // Launchers fan their helper out over each running session of a type.
    registry.register(names::XSS, |spec| {
        Ok(Box::new(PerSessionLauncher::new(spec, names::XSS_SESSION, names::SESSION_X11)))
    });
    registry.register(names::TTY_IDLE, |spec| {
        Ok(Box::new(PerSessionLauncher::new(spec, names::TTY_IDLE_SESSION, names::SESSION_TTY)))
    });
    registry.register("dpms", |spec| {
        Ok(Box::new(PerSessionLauncher::new(spec, DPMS_SESSION, names::SESSION_X11)))
    });

    registry.register(names::XSS_SESSION, |spec| {
        Ok(Box::new(XssBridge::from_spec(spec).map_err(user_err)?))
    });
    registry.register(names::TTY_IDLE_SESSION, |spec| {
        Ok(Box::new(TtyWatch::from_spec(spec).map_err(user_err)?))
    });
    registry.register(DPMS_SESSION, |spec| {
        Ok(Box::new(DpmsSessionModule::from_spec(spec).map_err(user_err)?))
    });

    registry.register(names::XSET, |spec| {
        Ok(Box::new(XsetModule::from_spec(spec).map_err(user_err)?))
    });
    registry.register(names::TIMER, |spec| {
        Ok(Box::new(TimerModule::from_spec(spec).map_err(user_err)?))
    });
    registry.register(names::LOCK, |_| Ok(Box::new(LockModule)));

    registry.register(names::SESSION_X11, |spec| {
        Ok(Box::new(X11Session::new(session_arg(spec)?)))
    });
    registry.register(names::SESSION_TTY, |spec| {
        Ok(Box::new(TtySession::new(session_arg(spec)?)))
    });
    registry.register(names::SESSION_REMOTE, |spec| {
        Ok(Box::new(RemoteSession::new(session_arg(spec)?)))
    });

    registry.register("locker", |spec| Ok(Box::new(LockerModule::from_spec(spec))));
    registry.register("backlight", |spec| Ok(Box::new(BacklightModule::from_spec(spec))));
    registry.register("dunst", |_| Ok(Box::new(DunstModule)));
    registry.register("xkbmap", |spec| Ok(Box::new(XkbmapModule::from_spec(spec))));
    registry.register("power", |spec| Ok(Box::new(PowerModule::from_spec(spec))));
    registry.register("upower", |spec| Ok(Box::new(UpowerModule::from_spec(spec))));
    registry.register("logind", |spec| Ok(Box::new(LogindModule::from_spec(spec))));

    registry.register(names::BUS_SERVER, |spec| {
        let addr = spec
            .arg(0)
            .ok_or_else(|| UserError::new("bus_server needs a listen address"))?;
        Ok(Box::new(BusServerModule::new(addr)))
    });
    registry.register(names::BUS_CLIENT, |spec| {
        let addr = spec
            .arg(0)
            .ok_or_else(|| UserError::new("bus_client needs a server address"))?;
        Ok(Box::new(BusClientModule::new(addr)))
    });
    registry.register(names::REMOTE_SENDER, |spec| {
        Ok(Box::new(RemoteSenderModule::from_spec(spec).map_err(user_err)?))
    });
    registry.register(names::REMOTE_RECEIVER, |_| Ok(Box::new(RemoteReceiverModule)));

    registry
}
