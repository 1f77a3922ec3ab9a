//! Invalidation events and the in-memory queue that carries them.
//!
//! Write paths publish a `Mutation` after the store commit; the consumer
//! drains the queue, merges the batch into one plan and applies it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::types::{DishId, MenuId, SubmenuId};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

pub(crate) const METRIC_QUEUE_LENGTH: &str = "menu_cache_invalidation_queue_length";
pub(crate) const METRIC_QUEUE_OVERFLOWS: &str = "menu_cache_invalidation_queue_overflows_total";

/// Monotonic epoch for ordering events within this process.
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }

    /// Creates and deletes change the descendant counts of every ancestor.
    pub fn changes_counts(self) -> bool {
        matches!(self, MutationKind::Create | MutationKind::Delete)
    }
}

/// A committed change to the store of record, with its ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
    Menu {
        kind: MutationKind,
        menu_id: MenuId,
    },
    Submenu {
        kind: MutationKind,
        menu_id: MenuId,
        submenu_id: SubmenuId,
    },
    Dish {
        kind: MutationKind,
        menu_id: MenuId,
        submenu_id: SubmenuId,
        dish_id: DishId,
    },
    /// Drop every cached entry.
    Flush,
}

impl Mutation {
    pub fn level(&self) -> &'static str {
        match self {
            Mutation::Menu { .. } => "menu",
            Mutation::Submenu { .. } => "submenu",
            Mutation::Dish { .. } => "dish",
            Mutation::Flush => "flush",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvalidationEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    pub epoch: Epoch,
    pub mutation: Mutation,
    /// Failed application attempts so far.
    pub attempts: u32,
    pub enqueued_at: OffsetDateTime,
}

impl InvalidationEvent {
    pub fn new(mutation: Mutation, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            mutation,
            attempts: 0,
            enqueued_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Bounded FIFO of pending invalidations.
///
/// When the queue is full its contents collapse into a single `Flush`
/// event, so an overflow costs a cold cache but never a stale one.
pub struct InvalidationQueue {
    queue: Mutex<VecDeque<InvalidationEvent>>,
    epoch_counter: AtomicU64,
    limit: usize,
}

impl InvalidationQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
            limit: limit.max(1),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, mutation: Mutation) {
        let event = InvalidationEvent::new(mutation, self.next_epoch());

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            mutation = ?event.mutation,
            "Invalidation event enqueued"
        );

        self.push(event);
    }

    /// Put back events whose application failed.
    pub fn requeue(&self, events: Vec<InvalidationEvent>) {
        for event in events {
            self.push(event);
        }
    }

    fn push(&self, event: InvalidationEvent) {
        let mut queue = mutex_lock(&self.queue, SOURCE, "push");
        if queue.len() >= self.limit {
            let dropped = queue.len();
            let attempts = queue.iter().map(|e| e.attempts).max().unwrap_or(0);
            queue.clear();
            let mut flush = InvalidationEvent::new(Mutation::Flush, self.next_epoch());
            flush.attempts = attempts.max(event.attempts);
            warn!(
                dropped,
                limit = self.limit,
                flush_event_id = %flush.id,
                "Invalidation queue overflowed; collapsing into a full flush"
            );
            counter!(METRIC_QUEUE_OVERFLOWS).increment(1);
            queue.push_back(flush);
        } else {
            queue.push_back(event);
        }
        gauge!(METRIC_QUEUE_LENGTH).set(queue.len() as f64);
    }

    /// Drain up to `limit` events in FIFO order.
    pub fn drain(&self, limit: usize) -> Vec<InvalidationEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained = queue.drain(..count).collect();
        gauge!(METRIC_QUEUE_LENGTH).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
        gauge!(METRIC_QUEUE_LENGTH).set(0.0);
    }
}
