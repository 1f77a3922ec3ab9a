//! Events that exhausted their retries.
//!
//! Kept in a bounded log so an operator (or the redrive job) can replay
//! them once the backend is reachable again.

use std::collections::VecDeque;
use std::sync::Mutex;

use metrics::counter;
use time::OffsetDateTime;
use tracing::error;

use super::events::InvalidationEvent;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::dead_letter";

pub(crate) const METRIC_DEAD_LETTERS: &str = "menu_cache_dead_letters_total";

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: InvalidationEvent,
    pub reason: String,
    pub failed_at: OffsetDateTime,
}

pub struct DeadLetterLog {
    entries: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Record a failed event; the oldest entry is discarded when full.
    pub fn record(&self, event: InvalidationEvent, reason: impl Into<String>) {
        let reason = reason.into();
        error!(
            event_id = %event.id,
            event_epoch = event.epoch,
            attempts = event.attempts,
            mutation = ?event.mutation,
            reason = %reason,
            "Invalidation event moved to dead-letter log"
        );
        counter!(METRIC_DEAD_LETTERS, "level" => event.mutation.level()).increment(1);

        let mut entries = mutex_lock(&self.entries, SOURCE, "record");
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(DeadLetter {
            event,
            reason,
            failed_at: OffsetDateTime::now_utc(),
        });
    }

    /// Remove and return every entry, oldest first.
    pub fn take_all(&self) -> Vec<DeadLetter> {
        mutex_lock(&self.entries, SOURCE, "take_all").drain(..).collect()
    }

    pub fn snapshot(&self) -> Vec<DeadLetter> {
        mutex_lock(&self.entries, SOURCE, "snapshot")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::events::Mutation;

    #[test]
    fn bounded_log_drops_oldest() {
        let log = DeadLetterLog::new(2);
        for epoch in 0..3 {
            log.record(InvalidationEvent::new(Mutation::Flush, epoch), "down");
        }

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.epoch, 1);
        assert_eq!(entries[1].event.epoch, 2);
    }

    #[test]
    fn take_all_empties_the_log() {
        let log = DeadLetterLog::new(4);
        log.record(InvalidationEvent::new(Mutation::Flush, 0), "timeout");

        let taken = log.take_all();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].reason, "timeout");
        assert!(log.is_empty());
    }
}
