//! Deferred actions keyed by cancellable tokens.

use std::time::Duration;

use visceral_reclaimer_core::SurvivorId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerToken(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerAction {
    AutoResolveEncounter { survivor: SurvivorId },
}

#[derive(Clone, Copy, Debug)]
struct ScheduledTimer {
    token: TimerToken,
    due: Duration,
    action: TimerAction,
}

#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    next_token: u64,
    pending: Vec<ScheduledTimer>,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(&mut self, due: Duration, action: TimerAction) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.pending.push(ScheduledTimer { token, due, action });
        token
    }

    /// Returns whether a pending timer was removed.
    pub(crate) fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.token != token);
        self.pending.len() != before
    }

    /// Removes and returns every timer due at or before `now`, ordered by due
    /// time and then by scheduling order.
    pub(crate) fn drain_due(&mut self, now: Duration) -> Vec<(TimerToken, TimerAction)> {
        let mut due: Vec<ScheduledTimer> = Vec::new();
        self.pending.retain(|timer| {
            if timer.due <= now {
                due.push(*timer);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|timer| (timer.due, timer.token));
        due.into_iter()
            .map(|timer| (timer.token, timer.action))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: u32) -> TimerAction {
        TimerAction::AutoResolveEncounter {
            survivor: SurvivorId::new(id),
        }
    }

    #[test]
    fn drains_only_due_timers_in_order() {
        let mut queue = TimerQueue::new();
        let late = queue.schedule(Duration::from_secs(9), action(0));
        let second = queue.schedule(Duration::from_secs(4), action(1));
        let first = queue.schedule(Duration::from_secs(2), action(2));

        let fired = queue.drain_due(Duration::from_secs(4));

        assert_eq!(fired, vec![(first, action(2)), (second, action(1))]);
        assert_eq!(queue.len(), 1);
        assert!(queue.cancel(late));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let token = queue.schedule(Duration::from_secs(1), action(0));

        assert!(queue.cancel(token));
        assert!(!queue.cancel(token));
        assert!(queue.drain_due(Duration::from_secs(10)).is_empty());
    }
}
