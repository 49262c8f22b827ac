/*!
 * Timestamp Conversion
 * Millisecond timestamps to and from the platform's time structures
 */

/// Split milliseconds into whole seconds and remaining microseconds.
///
/// The fractional millisecond is floored first; division and remainder then
/// truncate toward zero, matching C integer arithmetic.
#[inline]
#[must_use]
pub fn split_millis(ms: f64) -> (i64, i64) {
    let whole = ms.floor() as i64;
    (whole / 1000, (whole % 1000) * 1000)
}

#[must_use]
pub fn to_timeval(ms: f64) -> libc::timeval {
    let (secs, micros) = split_millis(ms);
    libc::timeval {
        tv_sec: secs as libc::time_t,
        tv_usec: micros as libc::suseconds_t,
    }
}

/// Same split as [`to_timeval`], with microseconds widened to nanoseconds
#[must_use]
pub fn to_timespec(ms: f64) -> libc::timespec {
    let (secs, micros) = split_millis(ms);
    libc::timespec {
        tv_sec: secs as libc::time_t,
        tv_nsec: (micros * 1000) as libc::c_long,
    }
}

/// Seconds plus nanoseconds as fractional milliseconds
#[inline]
#[must_use]
pub fn to_millis(secs: i64, nsec: i64) -> f64 {
    secs as f64 * 1000.0 + nsec as f64 / 1_000_000.0
}
