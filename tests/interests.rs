//! Lifecycle interest tests.
//!
//! The stop and reload request flags are process-global, so these tests
//! are serialised with a lock; the test harness otherwise runs them on
//! concurrent threads.

use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use eddy::{Lifecycle, Runtime};

mod util;

use crate::util::{append, init, shared_log};

static LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|err| err.into_inner())
}

#[test]
fn reload_drains_before_scheduled_work() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let _interest = runtime.register_interest(Lifecycle::Reload, append(&log, "R"));
    runtime.reload();
    let _scheduled = runtime.schedule(append(&log, "S"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["R", "S"]);
}

#[test]
fn reload_request_is_consumed_by_the_drain() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let _interest = runtime.register_interest(Lifecycle::Reload, append(&log, "first"));
    runtime.reload();
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first"]);

    // The drain cleared the request; a new interest waits for the next
    // reload.
    let _interest = runtime.register_interest(Lifecycle::Reload, append(&log, "second"));
    let _scheduled = runtime.schedule(append(&log, "scheduled"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first", "scheduled"]);
}

#[test]
fn stop_handlers_run_before_other_work() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let _interest = runtime.register_interest(Lifecycle::Stop, append(&log, "stopped"));
    runtime.stop();
    let _scheduled = runtime.schedule(append(&log, "scheduled"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["stopped", "scheduled"]);
}

#[test]
fn interests_wait_for_a_request() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    // No stop or reload requested: interests stay queued and do not keep
    // the loop alive.
    let _stop = runtime.register_interest(Lifecycle::Stop, append(&log, "stop"));
    let _reload = runtime.register_interest(Lifecycle::Reload, append(&log, "reload"));
    let _scheduled = runtime.schedule(append(&log, "scheduled"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["scheduled"]);
}

#[test]
fn cancelled_interest_is_not_drained() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let first = runtime.register_interest(Lifecycle::Stop, append(&log, "first"));
    let _second = runtime.register_interest(Lifecycle::Stop, append(&log, "second"));
    runtime.cancel(first);
    runtime.stop();
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["second"]);
}

#[test]
fn stop_handler_may_cancel_a_later_handler() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    use std::cell::Cell;
    let victim: Rc<Cell<Option<eddy::Action>>> = Rc::new(Cell::new(None));
    let victim2 = Rc::clone(&victim);
    let first_log = Rc::clone(&log);
    let _first = runtime.register_interest(Lifecycle::Stop, move |runtime| {
        first_log.borrow_mut().push("first");
        runtime.cancel(victim2.take().unwrap());
    });
    victim.set(Some(runtime.register_interest(Lifecycle::Stop, append(&log, "victim"))));

    runtime.stop();
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first"]);
}

#[test]
fn stop_handlers_registered_during_a_drain_wait_for_the_next_pass() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    // The cascading handler is not run in the same drain. With no other
    // work pending the loop terminates before a second pass, which is
    // exactly why cascading stop handlers are flagged as misuse.
    let newcomer = append(&log, "newcomer");
    let first_log = Rc::clone(&log);
    let _first = runtime.register_interest(Lifecycle::Stop, move |runtime| {
        first_log.borrow_mut().push("first");
        let _late = runtime.register_interest(Lifecycle::Stop, newcomer);
    });
    runtime.stop();
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first"]);
}

#[test]
fn cascaded_stop_handler_runs_once_more_work_arrives() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    // Same cascade, but enough pending work forces another iteration;
    // the stop request is still outstanding, so the next pass drains the
    // newcomer before performing the remaining ready callback.
    let newcomer = append(&log, "newcomer");
    let first_log = Rc::clone(&log);
    let _first = runtime.register_interest(Lifecycle::Stop, move |runtime| {
        first_log.borrow_mut().push("first");
        let _late = runtime.register_interest(Lifecycle::Stop, newcomer);
    });
    runtime.stop();
    let _f1 = runtime.schedule(append(&log, "f1"));
    let _f2 = runtime.schedule(append(&log, "f2"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first", "f1", "newcomer", "f2"]);
}

#[test]
fn reload_handlers_registered_during_a_drain_wait_for_the_next_request() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let newcomer = append(&log, "newcomer");
    let first_log = Rc::clone(&log);
    let _first = runtime.register_interest(Lifecycle::Reload, move |runtime| {
        first_log.borrow_mut().push("first");
        let _late = runtime.register_interest(Lifecycle::Reload, newcomer);
    });
    runtime.reload();
    // Extra iterations don't help: the drain consumed the request.
    let _filler = runtime.schedule(append(&log, "filler"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first", "filler"]);
}

#[test]
fn reload_signal_is_trapped() {
    let _guard = lock();
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let _interest = runtime.register_interest(Lifecycle::Reload, append(&log, "reload"));

    // Raise the signal from a timer callback. The handler only sets the
    // request flag, observed at the top of the following iteration, so
    // the callback also queues enough work to get the loop there.
    let _timer = runtime.timeout(Duration::from_millis(10), |runtime| {
        assert_eq!(unsafe { libc::raise(libc::SIGHUP) }, 0);
        let _filler1 = runtime.schedule(|_| {});
        let _filler2 = runtime.schedule(|_| {});
    });
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["reload"]);
}
