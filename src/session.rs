//! Shared state for one canvas session.
//!
//! DESIGN
//! ======
//! The engine mutates the session synchronously inside pointer handlers;
//! spawned write tasks lock it again only after their store call resolves.
//! The lock is a plain `std::sync::Mutex` and is never held across an
//! `.await`, so there is no contention beyond a few map operations.
//!
//! The write ledger has two parts: `in_flight` counts the outstanding store
//! calls per entity (a new drag on it is refused until the count drops to
//! zero), and `pending` holds nudge moves waiting for their debounce timer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::doc::{DocStore, EntityId};
use crate::optimistic::OptimisticStore;

/// A debounced move that has not been handed to the store yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingMove {
    /// Accumulated normalized delta.
    pub dx: f64,
    pub dy: f64,
    /// Bumped on every accumulation; a timer only fires for the generation it was armed with.
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    pub doc: DocStore,
    pub optimistic: OptimisticStore,
    /// Outstanding store calls per entity. Ids with no call are absent.
    pub in_flight: HashMap<EntityId, usize>,
    /// Keyed by the sorted id group the move applies to.
    pub pending: HashMap<Vec<EntityId>, PendingMove>,
    /// Writes submitted but not yet resolved, creates included.
    pub outstanding: usize,
}

impl Session {
    /// True when any of `ids` has a store call outstanding.
    #[must_use]
    pub fn any_in_flight(&self, ids: &[EntityId]) -> bool {
        ids.iter().any(|id| self.in_flight.contains_key(id))
    }

    /// Record one more outstanding call for each of `ids`.
    pub fn mark_in_flight(&mut self, ids: &[EntityId]) {
        for id in ids {
            *self.in_flight.entry(*id).or_insert(0) += 1;
        }
    }

    /// Record that one call for each of `ids` resolved.
    pub fn release_in_flight(&mut self, ids: &[EntityId]) {
        for id in ids {
            if let Some(count) = self.in_flight.get_mut(id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.in_flight.remove(id);
                }
            }
        }
    }

    /// True when no write is outstanding and no nudge is waiting for its timer.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outstanding == 0 && self.pending.is_empty()
    }

    /// Ids that must survive optimistic TTL collection: pending nudges.
    #[must_use]
    pub fn pending_ids(&self) -> HashSet<EntityId> {
        self.pending.keys().flatten().copied().collect()
    }
}

/// Cheaply cloneable handle to a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Lock the session. A poisoned lock is recovered; session state stays usable.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
