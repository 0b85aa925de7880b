//! Deadline store.
//!
//! A [`Deadline`] is a plain value: when the current activation started and
//! when it ends, in monotonic milliseconds. [`DeadlineStore`] wraps one
//! deadline together with the channel's committed output state `S` behind
//! a single mutex, so that an evaluator's "read deadline, compare with the
//! committed level, write the pin" and a connection's "overwrite deadline"
//! are each atomic with respect to the other.
//!
//! Timestamps are `u64`, wider than the ESP32's native atomic word, so
//! they are never read outside the lock.

use std::sync::{Mutex, PoisonError};

/// Activation window of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: u64,
    active_until: u64,
}

impl Deadline {
    /// An inactive deadline anchored at `now_ms` (`active_until == now_ms`).
    pub const fn expired_at(now_ms: u64) -> Self {
        Self {
            started_at: now_ms,
            active_until: now_ms,
        }
    }

    /// Set `active_until = now + duration`, unconditionally.
    ///
    /// A shorter request shortens an activation in progress; the call is
    /// an overwrite, never a max and never cumulative.
    pub fn extend(&mut self, now_ms: u64, duration_ms: u32) {
        self.started_at = now_ms;
        self.active_until = now_ms.saturating_add(u64::from(duration_ms));
    }

    /// `now < active_until`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.active_until
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn active_until(&self) -> u64 {
        self.active_until
    }

    /// Length of the activation that produced this deadline.
    pub fn duration_ms(&self) -> u64 {
        self.active_until - self.started_at
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.active_until.saturating_sub(now_ms)
    }
}

struct Slot<S> {
    deadline: Deadline,
    state: S,
}

/// A deadline plus the output state it governs, under one lock.
pub struct DeadlineStore<S> {
    slot: Mutex<Slot<S>>,
}

impl<S> DeadlineStore<S> {
    /// Inactive store (`active_until = now_ms`) holding `state`.
    pub fn new(now_ms: u64, state: S) -> Self {
        Self {
            slot: Mutex::new(Slot {
                deadline: Deadline::expired_at(now_ms),
                state,
            }),
        }
    }

    /// Overwrite the deadline. Safe to call from any thread.
    pub fn extend(&self, now_ms: u64, duration_ms: u32) {
        self.with(|deadline, _| deadline.extend(now_ms, duration_ms));
    }

    /// Consistent copy of the current deadline.
    pub fn deadline(&self) -> Deadline {
        self.with(|deadline, _| *deadline)
    }

    /// Binary evaluation: a pure function of `(active_until, now)`.
    pub fn evaluate(&self, now_ms: u64) -> bool {
        self.with(|deadline, _| deadline.is_active(now_ms))
    }

    /// Run `f` with exclusive access to the deadline and the output state.
    ///
    /// Everything that must be atomic (compare-and-commit, multi-deadline
    /// extends) goes through here.
    pub fn with<R>(&self, f: impl FnOnce(&mut Deadline, &mut S) -> R) -> R {
        // The slot holds plain timestamps; a panic mid-update cannot leave
        // it in a state worse than "last writer wins".
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Slot { deadline, state } = &mut *slot;
        f(deadline, state)
    }
}
