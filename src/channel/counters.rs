//! Test hooks for the write and read loops.
//!
//! Production builds compile these down to pass-throughs; under `test` (or the
//! `mutants` feature) a thread-local limit forces short writes and counters
//! expose how many iterations a flush needed.

#[cfg(any(test, feature = "mutants"))]
use std::cell::Cell;
#[cfg(any(test, feature = "mutants"))]
use std::time::{Duration, Instant};

#[cfg(any(test, feature = "mutants"))]
thread_local! {
    static WRITE_CHUNK_LIMIT: Cell<usize> = const { Cell::new(usize::MAX) };
    static FLUSH_WRITE_COUNT: Cell<usize> = const { Cell::new(0) };
    static WRITABLE_WAIT_COUNT: Cell<usize> = const { Cell::new(0) };
}

#[cfg(any(test, feature = "mutants"))]
#[allow(dead_code)]
pub(crate) fn set_write_chunk_limit(limit: Option<usize>) {
    WRITE_CHUNK_LIMIT.with(|value| value.set(limit.unwrap_or(usize::MAX)));
}

#[cfg(any(test, feature = "mutants"))]
#[allow(dead_code)]
pub(crate) fn reset_flush_counters() {
    FLUSH_WRITE_COUNT.with(|count| count.set(0));
    WRITABLE_WAIT_COUNT.with(|count| count.set(0));
}

#[cfg(any(test, feature = "mutants"))]
#[allow(dead_code)]
pub(crate) fn flush_write_count() -> usize {
    FLUSH_WRITE_COUNT.with(|count| count.get())
}

#[cfg(any(test, feature = "mutants"))]
#[allow(dead_code)]
pub(crate) fn writable_wait_count() -> usize {
    WRITABLE_WAIT_COUNT.with(|count| count.get())
}

#[cfg(any(test, feature = "mutants"))]
pub(super) fn record_flush_write() {
    FLUSH_WRITE_COUNT.with(|count| count.set(count.get().saturating_add(1)));
}

#[cfg(any(test, feature = "mutants"))]
pub(super) fn record_writable_wait() {
    WRITABLE_WAIT_COUNT.with(|count| count.set(count.get().saturating_add(1)));
}

#[cfg(any(test, feature = "mutants"))]
pub(crate) fn guard_elapsed_exceeded(elapsed: Duration, iterations: usize, limit: usize) -> bool {
    elapsed > Duration::from_secs(5) || iterations > limit
}

/// Panic when a loop spins longer than any sane run would.
#[cfg(any(test, feature = "mutants"))]
pub(crate) fn guard_loop(start: Instant, iterations: usize, limit: usize, label: &str) {
    if guard_elapsed_exceeded(start.elapsed(), iterations, limit) {
        panic!("{label} loop guard exceeded");
    }
}

pub(super) fn write_chunk_limit(len: usize) -> usize {
    #[cfg(any(test, feature = "mutants"))]
    {
        WRITE_CHUNK_LIMIT.with(|limit| len.min(limit.get()))
    }
    #[cfg(not(any(test, feature = "mutants")))]
    {
        len
    }
}
