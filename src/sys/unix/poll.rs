use std::cmp::min;
use std::io;
use std::time::Duration;

/// Block on `poll(2)` until a descriptor in `fds` has returned events or
/// `timeout` elapses, `None` meaning indefinitely.
///
/// `fds` may be empty, in which case this is a plain bounded sleep, which
/// is exactly what the loop needs while only timers are pending.
pub fn poll(fds: &mut [libc::pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let timeout_ms = timeout.map(duration_to_millis).unwrap_or(-1);

    let n_events = unsafe {
        libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms)
    };
    if n_events == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n_events as usize)
    }
}

const MILLIS_PER_SEC: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// Convert a `Duration` to milliseconds, rounding up so a wait never
/// wakes before the deadline it bounds.
fn duration_to_millis(duration: Duration) -> libc::c_int {
    let sub_millis = (u64::from(duration.subsec_nanos()) + (NANOS_PER_MILLI - 1)) / NANOS_PER_MILLI;
    let millis = duration.as_secs().saturating_mul(MILLIS_PER_SEC)
        .saturating_add(sub_millis);
    min(millis, libc::c_int::max_value() as u64) as libc::c_int
}
