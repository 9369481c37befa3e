//! Cancellation handles for submitted work.

use crate::interest::Lifecycle;
use crate::runtime::Runtime;

/// Cancellable handle returned by every asynchronous submission.
///
/// An `Action` does not borrow the runtime; it is a plain value naming a
/// slot in one of the runtime's tables together with the generation the
/// slot had at submission time. Cancelling through a handle whose slot has
/// since been consumed (the callback ran) or reused is a safe no-op, which
/// makes [`cancel`] idempotent: after the first call the bound callback is
/// guaranteed not to run, and later calls find a stale handle.
///
/// The submitter owns the `Action`. Dropping an `Action` whose callback
/// has not yet fired without cancelling it leaves the callback queued;
/// that is a usage error for operations whose callback must not outlive
/// its submitter.
///
/// [`cancel`]: Action::cancel
///
/// # Examples
///
/// ```
/// use eddy::Runtime;
///
/// let mut runtime = Runtime::new();
/// let action = runtime.schedule(|_| panic!("cancelled callbacks never run"));
/// action.cancel(&mut runtime);
/// action.cancel(&mut runtime); // Idempotent.
/// runtime.start().unwrap();
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Action {
    pub(crate) source: Source,
    pub(crate) key: usize,
    pub(crate) generation: u64,
}

impl Action {
    pub(crate) fn new(source: Source, key: usize, generation: u64) -> Action {
        Action { source, key, generation }
    }

    /// Cancel the submission this handle refers to.
    ///
    /// Convenience for [`Runtime::cancel`]; see that method for the
    /// semantics.
    pub fn cancel(self, runtime: &mut Runtime) {
        runtime.cancel(self)
    }
}

/// The table an [`Action`] points into.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Source {
    Ready,
    Timer,
    Interest(Lifecycle),
    Poll,
    Cancellation,
}
