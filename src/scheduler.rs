/*!
A single-threaded timer queue.

Tasks are ordered by their due time and then by insertion order, so two tasks
due at the same instant always run in the order they were scheduled. Time only
moves forward, and only when the owner calls [Scheduler::advance_to].
*/

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use rand::Rng;

/// Shortest delay a repeating task can be rescheduled with.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Convert seconds to a [Duration]. Negative and NaN become zero, values too
/// large to represent saturate.
pub fn seconds(value: f32) -> Duration {
    seconds_f64(f64::from(value))
}

/// Like [seconds], for `f64`.
pub fn seconds_f64(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// A random delay between `min` and `max` seconds, inclusive.
///
/// Never shorter than [MIN_INTERVAL], so a task that reschedules itself with
/// it always lands in the future.
pub fn random_interval<R: Rng>(rng: &mut R, min: f32, max: f32) -> Duration {
    let (min, max) = (seconds(min), seconds(max));

    let delay = if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    };

    delay.max(MIN_INTERVAL)
}

#[derive(Debug)]
struct Entry<T> {
    due: Duration,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the std max-heap pops the earliest entry first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// The current time of the queue, measured from its creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to run `delay` from now.
    ///
    /// Returns `false` and drops the task if its due time is past the end of
    /// what a [Duration] can hold.
    pub fn schedule_after(&mut self, delay: Duration, task: T) -> bool {
        let Some(due) = self.now.checked_add(delay) else {
            return false;
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        self.queue.push(Entry { due, seq, task });

        true
    }

    /// When the earliest task is due, if there is one.
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.peek().map(|e| e.due)
    }

    /// Remove and return the earliest task if it is due at or before `until`.
    ///
    /// Does not move the clock; the caller decides when time passes.
    pub fn pop_due(&mut self, until: Duration) -> Option<(Duration, T)> {
        if self.next_due()? > until {
            return None;
        }

        self.queue.pop().map(|e| (e.due, e.task))
    }

    /// Move the clock forward. Moving backwards is ignored.
    pub fn advance_to(&mut self, time: Duration) {
        if time > self.now {
            self.now = time;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
