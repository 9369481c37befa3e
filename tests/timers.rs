use std::time::{Duration, Instant};

use eddy::Runtime;

mod util;

use crate::util::{append, init, shared_log};

#[test]
fn equal_deadlines_fire_in_submission_order() {
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let _t1 = runtime.timeout(Duration::from_millis(0), append(&log, "1"));
    let _t2 = runtime.timeout(Duration::from_millis(0), append(&log, "2"));
    let _t3 = runtime.timeout(Duration::from_millis(0), append(&log, "3"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["1", "2", "3"]);
}

#[test]
fn work_scheduled_by_a_timer_runs_after_all_expired_timers() {
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    // The first timer schedules a ready callback; the second expired
    // timer still dispatches first because ripe timers drain before the
    // ready queue.
    let scheduled = append(&log, "scheduled");
    let timer_log = std::rc::Rc::clone(&log);
    let _t1 = runtime.timeout(Duration::from_millis(0), move |runtime| {
        timer_log.borrow_mut().push("t1");
        let _action = runtime.schedule(scheduled);
    });
    let _t2 = runtime.timeout(Duration::from_millis(0), append(&log, "t2"));
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["t1", "t2", "scheduled"]);
}

#[test]
fn cancelled_timer_never_fires() {
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let cancelled = runtime.timeout(Duration::from_millis(0), append(&log, "cancelled"));
    let _kept = runtime.timeout(Duration::from_millis(0), append(&log, "kept"));
    runtime.cancel(cancelled);
    runtime.cancel(cancelled);
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["kept"]);
}

#[test]
fn cancelling_the_earliest_timer_shortens_no_deadline() {
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    // Cancel a far deadline from a near timer; the loop must not keep
    // blocking for the cancelled one.
    let begin = Instant::now();
    let far = runtime.timeout(Duration::from_secs(60), append(&log, "far"));
    let near_log = std::rc::Rc::clone(&log);
    let _near = runtime.timeout(Duration::from_millis(10), move |runtime| {
        near_log.borrow_mut().push("near");
        runtime.cancel(far);
    });
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["near"]);
    assert!(begin.elapsed() < Duration::from_secs(60));
}

#[test]
fn timer_callback_may_submit_another_timer() {
    init();
    let mut runtime = Runtime::new();
    let log = shared_log();

    let second = append(&log, "second");
    let first_log = std::rc::Rc::clone(&log);
    let _first = runtime.timeout(Duration::from_millis(0), move |runtime| {
        first_log.borrow_mut().push("first");
        let _action = runtime.timeout(Duration::from_millis(10), second);
    });
    runtime.start().unwrap();
    assert_eq!(*log.borrow(), ["first", "second"]);
}
