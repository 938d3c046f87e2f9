#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic timer scheduler owned by the simulation loop.
//!
//! The scheduler keeps a priority queue of `(fire time, arming sequence)` keys.
//! Cancelling or pausing a timer leaves its stale queue entry behind; the entry
//! is discarded lazily when it reaches the front of the queue. The owner drains
//! due timers one at a time with [`Scheduler::pop_due`], so timers armed while
//! handling an expiry are measured from that expiry's fire time.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap},
    time::Duration,
};

use bulwark_core::{TimerHandle, TimerService};
use tracing::trace;

/// Timer that came due, handed back to the owner for dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct Expiry<T> {
    /// Handle of the timer that fired.
    pub handle: TimerHandle,
    /// Payload registered with the timer.
    pub payload: T,
    /// Simulation time at which the timer fired.
    pub fire_at: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    fire_at: Duration,
    sequence: u64,
    handle: TimerHandle,
}

#[derive(Clone, Copy, Debug)]
enum TimerState {
    Armed { fire_at: Duration, sequence: u64 },
    Paused { remaining: Duration },
}

#[derive(Clone, Debug)]
struct TimerEntry<T> {
    payload: T,
    interval: Duration,
    repeating: bool,
    state: TimerState,
}

/// Priority-queue timer service with pause and resume support.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_handle: u64,
    next_sequence: u64,
    timers: BTreeMap<TimerHandle, TimerEntry<T>>,
    queue: BinaryHeap<Reverse<QueueKey>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_handle: 1,
            next_sequence: 0,
            timers: BTreeMap::new(),
            queue: BinaryHeap::new(),
        }
    }
}

impl<T: Clone> Scheduler<T> {
    /// Creates a scheduler whose clock starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of armed timers that are not paused.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.timers
            .values()
            .filter(|entry| matches!(entry.state, TimerState::Armed { .. }))
            .count()
    }

    /// Time left before the timer fires, frozen while paused.
    #[must_use]
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.timers.get(&handle).map(|entry| match entry.state {
            TimerState::Armed { fire_at, .. } => fire_at.saturating_sub(self.now),
            TimerState::Paused { remaining } => remaining,
        })
    }

    /// Payload of a live timer.
    #[must_use]
    pub fn payload(&self, handle: TimerHandle) -> Option<&T> {
        self.timers.get(&handle).map(|entry| &entry.payload)
    }

    /// Removes and returns the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's fire time. Repeating timers are re-armed
    /// one interval after the fire time, so a long `until` yields every
    /// repetition in order.
    pub fn pop_due(&mut self, until: Duration) -> Option<Expiry<T>> {
        while let Some(Reverse(key)) = self.queue.peek().copied() {
            if key.fire_at > until {
                return None;
            }
            let _ = self.queue.pop();

            let Some(entry) = self.timers.get(&key.handle) else {
                continue;
            };
            let current = matches!(
                entry.state,
                TimerState::Armed { sequence, .. } if sequence == key.sequence
            );
            if !current {
                continue;
            }

            self.now = self.now.max(key.fire_at);
            let expiry = if entry.repeating {
                let payload = entry.payload.clone();
                let next = key.fire_at.saturating_add(entry.interval);
                self.arm(key.handle, next);
                Expiry {
                    handle: key.handle,
                    payload,
                    fire_at: key.fire_at,
                }
            } else {
                let entry = self.timers.remove(&key.handle)?;
                Expiry {
                    handle: key.handle,
                    payload: entry.payload,
                    fire_at: key.fire_at,
                }
            };
            return Some(expiry);
        }
        None
    }

    /// Moves the clock forward to `until` once every due timer has been popped.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Advances the clock by `dt`, collecting every expiry in fire order.
    ///
    /// Use [`Scheduler::pop_due`] instead when handlers arm new timers.
    pub fn advance(&mut self, dt: Duration) -> Vec<Expiry<T>> {
        let until = self.now.saturating_add(dt);
        let mut fired = Vec::new();
        while let Some(expiry) = self.pop_due(until) {
            fired.push(expiry);
        }
        self.settle(until);
        fired
    }

    /// Pauses every armed timer.
    pub fn pause_all(&mut self) {
        let handles: Vec<TimerHandle> = self.timers.keys().copied().collect();
        for handle in handles {
            self.pause(handle);
        }
    }

    /// Resumes every paused timer, in handle order.
    pub fn resume_all(&mut self) {
        let handles: Vec<TimerHandle> = self.timers.keys().copied().collect();
        for handle in handles {
            self.resume(handle);
        }
    }

    fn arm(&mut self, handle: TimerHandle, fire_at: Duration) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        if let Some(entry) = self.timers.get_mut(&handle) {
            entry.state = TimerState::Armed { fire_at, sequence };
            self.queue.push(Reverse(QueueKey {
                fire_at,
                sequence,
                handle,
            }));
        }
    }
}

impl<T: Clone> TimerService<T> for Scheduler<T> {
    fn schedule(&mut self, delay: Duration, repeating: bool, payload: T) -> TimerHandle {
        let handle = TimerHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        if delay.is_zero() {
            trace!(handle = handle.get(), "timer_rejected_zero_delay");
            return handle;
        }

        let _ = self.timers.insert(
            handle,
            TimerEntry {
                payload,
                interval: delay,
                repeating,
                state: TimerState::Paused {
                    remaining: Duration::ZERO,
                },
            },
        );
        self.arm(handle, self.now.saturating_add(delay));
        trace!(handle = handle.get(), ?delay, repeating, "timer_armed");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.timers.remove(&handle).is_some() {
            trace!(handle = handle.get(), "timer_cancelled");
        }
    }

    fn pause(&mut self, handle: TimerHandle) {
        let now = self.now;
        if let Some(entry) = self.timers.get_mut(&handle) {
            if let TimerState::Armed { fire_at, .. } = entry.state {
                entry.state = TimerState::Paused {
                    remaining: fire_at.saturating_sub(now),
                };
            }
        }
    }

    fn resume(&mut self, handle: TimerHandle) {
        let remaining = match self.timers.get(&handle).map(|entry| entry.state) {
            Some(TimerState::Paused { remaining }) => remaining,
            _ => return,
        };
        self.arm(handle, self.now.saturating_add(remaining));
    }

    fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers
            .get(&handle)
            .is_some_and(|entry| matches!(entry.state, TimerState::Armed { .. }))
    }

    fn is_paused(&self, handle: TimerHandle) -> bool {
        self.timers
            .get(&handle)
            .is_some_and(|entry| matches!(entry.state, TimerState::Paused { .. }))
    }
}
