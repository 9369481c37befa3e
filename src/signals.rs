//! Signal-triggered lifecycle requests.
//!
//! Two signals are trapped: `SIGINT` requests stop and `SIGHUP` requests
//! reload. Signal handlers have no context parameter, so the request
//! flags are process-global atomics; the handlers do nothing beyond a
//! `signal(2)` call and an atomic store, both async-signal-safe. The loop
//! observes the flags at the top of each iteration and never runs user
//! code from a handler.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use log::error;

pub(crate) const STOP_SIGNAL: libc::c_int = libc::SIGINT;
pub(crate) const RELOAD_SIGNAL: libc::c_int = libc::SIGHUP;

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);
static RELOAD_REQUESTED: AtomicBool = AtomicBool::new(false);

type Handler = extern "C" fn(libc::c_int);

// The handlers are limited to signal(2) and an atomic store, both
// async-signal-safe. In particular no logging here.

extern "C" fn stop_handler(_signal: libc::c_int) {
    let _ = unsafe { libc::signal(STOP_SIGNAL, libc::SIG_DFL) };
    STOP_REQUESTED.store(true, Ordering::Relaxed);
}

extern "C" fn reload_handler(_signal: libc::c_int) {
    let _ = unsafe { libc::signal(RELOAD_SIGNAL, libc::SIG_IGN) };
    RELOAD_REQUESTED.store(true, Ordering::Relaxed);
}

/// Trap the stop and reload signals and clear both request flags.
///
/// Called when a runtime is constructed; a fresh runtime starts with a
/// clean lifecycle even if a previous one was stopped.
pub(crate) fn install() {
    STOP_REQUESTED.store(false, Ordering::Relaxed);
    RELOAD_REQUESTED.store(false, Ordering::Relaxed);
    let stop: Handler = stop_handler;
    let reload: Handler = reload_handler;
    set_disposition(STOP_SIGNAL, stop as libc::sighandler_t);
    set_disposition(RELOAD_SIGNAL, reload as libc::sighandler_t);
}

/// Request the runtime to stop.
///
/// Restores the default disposition first, so a second stop signal
/// terminates the process the ordinary way.
pub(crate) fn request_stop() {
    set_disposition(STOP_SIGNAL, libc::SIG_DFL);
    STOP_REQUESTED.store(true, Ordering::Relaxed);
}

/// Request the runtime to reload.
///
/// The reload signal is ignored until the loop has drained the reload
/// interests and re-arms it.
pub(crate) fn request_reload() {
    set_disposition(RELOAD_SIGNAL, libc::SIG_IGN);
    RELOAD_REQUESTED.store(true, Ordering::Relaxed);
}

/// Clear the reload request and trap the reload signal again. Called by
/// the loop after draining reload interests.
pub(crate) fn rearm_reload() {
    RELOAD_REQUESTED.store(false, Ordering::Relaxed);
    let reload: Handler = reload_handler;
    set_disposition(RELOAD_SIGNAL, reload as libc::sighandler_t);
}

pub(crate) fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::Relaxed)
}

pub(crate) fn reload_requested() -> bool {
    RELOAD_REQUESTED.load(Ordering::Relaxed)
}

fn set_disposition(signal: libc::c_int, disposition: libc::sighandler_t) {
    if unsafe { libc::signal(signal, disposition) } == libc::SIG_ERR {
        // Only possible for an invalid signal number.
        error!("error setting signal disposition: signal={}, error={}",
            signal, io::Error::last_os_error());
    }
}
