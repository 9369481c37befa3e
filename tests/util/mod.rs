//! Collection of testing utilities.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use eddy::Runtime;

/// Initialise the test setup, things like logging etc.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(std_logger::init);
}

/// Log shared between the test body and its callbacks.
pub type Log = Rc<RefCell<Vec<&'static str>>>;

pub fn shared_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// A callback that appends `entry` to the shared log when it runs.
pub fn append(log: &Log, entry: &'static str) -> impl FnOnce(&mut Runtime) + 'static {
    let log = Rc::clone(log);
    move |_: &mut Runtime| log.borrow_mut().push(entry)
}
