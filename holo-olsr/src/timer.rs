//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Handle of a scheduled timer, used for cancellation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct TimerId(u64);

/// Poll-driven timer scheduler.
///
/// Timers never fire on their own: the owner calls [`Timers::poll`] once per
/// tick with the current time, and receives the events of every timer whose
/// deadline has passed. Periodic timers are rescheduled before their event
/// is returned, so cancelling a periodic timer from within the handling of
/// its own event is allowed.
#[derive(Debug)]
pub struct Timers<E> {
    queue: BTreeMap<(Instant, TimerId), TimerEntry<E>>,
    deadlines: HashMap<TimerId, Instant>,
    next_id: u64,
}

#[derive(Debug)]
struct TimerEntry<E> {
    event: E,
    period: Option<Duration>,
    jitter: bool,
}

// ===== impl Timers =====

impl<E> Timers<E>
where
    E: Clone,
{
    /// Schedules a timer that fires once after `delay`.
    pub fn start_oneshot(
        &mut self,
        now: Instant,
        delay: Duration,
        event: E,
    ) -> TimerId {
        self.insert(now + delay, event, None, false)
    }

    /// Schedules a timer that fires every `interval`, starting after
    /// `initial_delay`.
    ///
    /// When `jitter` is set, every expiration is advanced by a random
    /// amount in `[0, interval/4)` to avoid synchronization between nodes.
    pub fn start_periodic(
        &mut self,
        now: Instant,
        initial_delay: Duration,
        interval: Duration,
        jitter: bool,
        event: E,
    ) -> TimerId {
        let deadline = now + initial_delay;
        self.insert(deadline, event, Some(interval), jitter)
    }

    /// Cancels a pending timer, returning its event if it was still
    /// scheduled.
    pub fn cancel(&mut self, id: TimerId) -> Option<E> {
        let deadline = self.deadlines.remove(&id)?;
        self.queue.remove(&(deadline, id)).map(|entry| entry.event)
    }

    /// Returns the time left before the given timer expires.
    pub fn remaining(&self, id: TimerId, now: Instant) -> Option<Duration> {
        self.deadlines
            .get(&id)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Returns the earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Returns whether the given timer is still pending.
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Fires every timer whose deadline is at or before `now`, in deadline
    /// order.
    pub fn poll(&mut self, now: Instant) -> Vec<E> {
        let mut fired = vec![];
        while let Some(entry) = self.queue.first_entry() {
            let (deadline, id) = *entry.key();
            if deadline > now {
                break;
            }
            let entry = entry.remove();
            self.deadlines.remove(&id);

            // Reschedule periodic timers under the same handle.
            if let Some(period) = entry.period {
                let mut next = now + period;
                if entry.jitter {
                    next -= jitter(period);
                }
                fired.push(entry.event.clone());
                self.deadlines.insert(id, next);
                self.queue.insert((next, id), entry);
            } else {
                fired.push(entry.event);
            }
        }
        fired
    }

    fn insert(
        &mut self,
        deadline: Instant,
        event: E,
        period: Option<Duration>,
        jitter: bool,
    ) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let entry = TimerEntry {
            event,
            period,
            jitter,
        };
        self.queue.insert((deadline, id), entry);
        self.deadlines.insert(id, deadline);
        id
    }
}

impl<E> Default for Timers<E> {
    fn default() -> Timers<E> {
        Timers {
            queue: Default::default(),
            deadlines: Default::default(),
            next_id: 0,
        }
    }
}

// ===== global functions =====

// Returns a random jitter in the range [0, interval/4).
//
// Jitter is disabled when testing to keep the emission times deterministic.
pub fn jitter(interval: Duration) -> Duration {
    #[cfg(not(feature = "testing"))]
    {
        use rand::Rng;

        let max_jitter = interval.as_millis() as u64 / 4;
        if max_jitter == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(0..max_jitter);
        Duration::from_millis(jitter)
    }
    #[cfg(feature = "testing")]
    {
        let _ = interval;
        Duration::ZERO
    }
}

// ===== unit tests =====
