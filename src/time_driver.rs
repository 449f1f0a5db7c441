//! Discrete-event clock and scheduling primitives.
//!
//! The interference model never blocks: anything that has to happen later (the
//! carrier-sense notification at the start of a transmission) is handed to a
//! [`Scheduler`] as a fire-once event. The host simulator owns the scheduler and
//! routes [`ChannelEvent`]s back into the tracker when they fire.
//!
//! [`EventQueue`] is a minimal scheduler used by the scene runner and the tests.
//! It keys pending work by virtual timestamp in a `BTreeMap`; time only moves
//! when the next event is popped.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::time::Duration;

use serde::Deserialize;

use crate::simulation::interference::ChannelEvent;

/// Simulation timestamp in microseconds since the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Elapsed time since `earlier`, saturating at zero.
    pub fn duration_since(self, earlier: SimTime) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    pub fn saturating_add_micros(self, micros: u64) -> SimTime {
        SimTime(self.0.saturating_add(micros))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        self.saturating_add_micros(micros)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Read access to the global simulation clock.
pub trait Clock {
    fn now(&self) -> SimTime;
}

/// Fire-once, non-cancelable scheduling of channel events.
pub trait Scheduler: Clock {
    fn schedule_after(&mut self, delay: Duration, event: ChannelEvent);

    fn schedule_now(&mut self, event: ChannelEvent) {
        self.schedule_after(Duration::ZERO, event);
    }
}

/// Time-ordered queue of pending events.
///
/// Events that share a timestamp fire in insertion order. Popping an event
/// advances the clock to its timestamp; the clock never moves backwards.
pub struct EventQueue<E> {
    now: SimTime,
    next_seq: u64,
    queue: BTreeMap<(SimTime, u64), E>,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_seq: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Queue `event` at an absolute time. Times in the past are clamped to now.
    pub fn schedule_at(&mut self, at: SimTime, event: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.queue.insert((at, seq), event);
    }

    pub fn schedule_in(&mut self, delay: Duration, event: E) {
        let at = self.now + delay;
        self.schedule_at(at, event);
    }

    /// Remove the earliest event and advance the clock to it.
    pub fn pop_next(&mut self) -> Option<(SimTime, E)> {
        let ((at, _), event) = self.queue.pop_first()?;
        self.now = at;
        Some((at, event))
    }

    /// Move the clock forward without firing anything. Used by callers that
    /// drive time themselves; pending events earlier than `to` stay queued and
    /// fire at the new "now" when popped.
    pub fn advance_to(&mut self, to: SimTime) {
        if to > self.now {
            self.now = to;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clock for EventQueue<E> {
    fn now(&self) -> SimTime {
        self.now
    }
}

impl<E: From<ChannelEvent>> Scheduler for EventQueue<E> {
    fn schedule_after(&mut self, delay: Duration, event: ChannelEvent) {
        self.schedule_in(delay, E::from(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_pop_in_time_then_insertion_order() {
        let mut q: EventQueue<&str> = EventQueue::new();
        q.schedule_at(SimTime::from_micros(20), "late");
        q.schedule_at(SimTime::from_micros(10), "first");
        q.schedule_at(SimTime::from_micros(10), "second");

        assert_eq!(q.pop_next(), Some((SimTime::from_micros(10), "first")));
        assert_eq!(q.pop_next(), Some((SimTime::from_micros(10), "second")));
        assert_eq!(q.now(), SimTime::from_micros(10));
        assert_eq!(q.pop_next(), Some((SimTime::from_micros(20), "late")));
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn past_events_are_clamped_to_now() {
        let mut q: EventQueue<u8> = EventQueue::new();
        q.advance_to(SimTime::from_micros(100));
        q.schedule_at(SimTime::from_micros(5), 1);
        assert_eq!(q.pop_next(), Some((SimTime::from_micros(100), 1)));
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut q: EventQueue<u8> = EventQueue::new();
        q.advance_to(SimTime::from_micros(50));
        q.advance_to(SimTime::from_micros(10));
        assert_eq!(q.now(), SimTime::from_micros(50));
    }

    #[test]
    fn sim_time_arithmetic() {
        let t = SimTime::from_micros(1_000) + Duration::from_millis(2);
        assert_eq!(t.as_micros(), 3_000);
        assert_eq!(t.duration_since(SimTime::from_micros(500)), Duration::from_micros(2_500));
        assert_eq!(SimTime::ZERO.duration_since(t), Duration::ZERO);
        assert_eq!(t.to_string(), "3000us");
    }
}
