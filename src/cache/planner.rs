//! Invalidation fan-out.
//!
//! Maps a mutation to every cache key and namespace it can make stale, and
//! merges a batch of events into one plan.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::events::{InvalidationEvent, Mutation, MutationKind};
use super::keys::{CacheKey, KeyPrefix};

/// Keys to delete and namespaces to clear for a set of mutations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Clear the entire cache. Supersedes everything else.
    pub flush: bool,
    pub keys: BTreeSet<CacheKey>,
    pub prefixes: BTreeSet<KeyPrefix>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ flush: {}, keys: {}, prefixes: {} }}",
            self.flush,
            self.keys.len(),
            self.prefixes.len()
        )
    }
}

impl InvalidationPlan {
    /// Fan-out for a single mutation.
    pub fn for_mutation(mutation: &Mutation) -> Self {
        let mut plan = Self::default();
        match mutation {
            Mutation::Flush => plan.flush = true,
            Mutation::Menu { kind, menu_id } => {
                plan.keys.insert(CacheKey::Menu(menu_id.clone()));
                plan.keys.insert(CacheKey::AllMenus);
                plan.keys.insert(CacheKey::WholeTree);
                if *kind == MutationKind::Delete {
                    plan.prefixes.insert(KeyPrefix::Menu(menu_id.clone()));
                }
            }
            Mutation::Submenu {
                kind,
                menu_id,
                submenu_id,
            } => {
                plan.keys
                    .insert(CacheKey::Submenu(menu_id.clone(), submenu_id.clone()));
                plan.keys.insert(CacheKey::SubmenuList(menu_id.clone()));
                plan.keys.insert(CacheKey::AllMenus);
                plan.keys.insert(CacheKey::WholeTree);
                if kind.changes_counts() {
                    plan.keys.insert(CacheKey::Menu(menu_id.clone()));
                }
                if *kind == MutationKind::Delete {
                    plan.prefixes
                        .insert(KeyPrefix::Submenu(menu_id.clone(), submenu_id.clone()));
                }
            }
            Mutation::Dish {
                kind,
                menu_id,
                submenu_id,
                dish_id,
            } => {
                plan.keys.insert(CacheKey::Dish(
                    menu_id.clone(),
                    submenu_id.clone(),
                    dish_id.clone(),
                ));
                plan.keys
                    .insert(CacheKey::DishList(menu_id.clone(), submenu_id.clone()));
                plan.keys.insert(CacheKey::WholeTree);
                if kind.changes_counts() {
                    plan.keys
                        .insert(CacheKey::Submenu(menu_id.clone(), submenu_id.clone()));
                    plan.keys.insert(CacheKey::SubmenuList(menu_id.clone()));
                    plan.keys.insert(CacheKey::Menu(menu_id.clone()));
                    plan.keys.insert(CacheKey::AllMenus);
                }
                // A reused id must not inherit a discount left behind by a
                // cascading delete.
                if kind.changes_counts() {
                    plan.keys.insert(CacheKey::Discount(dish_id.clone()));
                }
            }
        }
        plan.normalize();
        plan
    }

    /// Merge a batch of events, ignoring duplicate event ids.
    pub fn from_events(events: &[InvalidationEvent]) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();
        for event in events.iter().filter(|e| seen_ids.insert(e.id)) {
            plan.merge(Self::for_mutation(&event.mutation));
        }
        plan
    }

    pub fn merge(&mut self, other: Self) {
        self.flush |= other.flush;
        self.keys.extend(other.keys);
        self.prefixes.extend(other.prefixes);
        self.normalize();
    }

    /// Drop prefixes nested in other prefixes and keys a prefix clear
    /// already removes. A flush makes every other action redundant.
    fn normalize(&mut self) {
        if self.flush {
            self.keys.clear();
            self.prefixes.clear();
            return;
        }

        let prefixes: Vec<KeyPrefix> = self.prefixes.iter().cloned().collect();
        self.prefixes.retain(|candidate| {
            !prefixes
                .iter()
                .any(|other| other != candidate && other.contains(candidate))
        });

        let prefixes = &self.prefixes;
        self.keys
            .retain(|key| !prefixes.iter().any(|prefix| key.is_covered_by(prefix)));
    }

    /// Exact keys to delete, including the root key of every cleared namespace.
    pub fn exact_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.iter().map(CacheKey::render).collect();
        keys.extend(self.prefixes.iter().map(|prefix| prefix.root().render()));
        keys
    }

    pub fn is_empty(&self) -> bool {
        !self.flush && self.keys.is_empty() && self.prefixes.is_empty()
    }
}
