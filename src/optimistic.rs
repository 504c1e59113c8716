//! Transient client-side overrides shown before a write resolves.
//!
//! An entry is visually authoritative over persisted geometry until the
//! write that carries it resolves, at which point its contribution is
//! reconciled away, or until it ages past the TTL. The TTL is a safety net
//! for lost responses, not the normal path.

#[cfg(test)]
#[path = "optimistic_test.rs"]
mod optimistic_test;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

use crate::consts::NORMALIZED_EPSILON;
use crate::coords::NormalizedRect;
use crate::doc::EntityId;

/// The geometric change an optimistic update previews.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// Normalized translation added to the persisted position.
    Move { dx: f64, dy: f64 },
    /// Normalized bounds replacing the persisted extent.
    Resize { bounds: NormalizedRect },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimisticUpdate {
    pub change: Change,
    /// When the entry was last written; drives TTL collection.
    pub timestamp: Instant,
}

/// Optimistic overrides keyed by entity id.
#[derive(Debug, Default)]
pub struct OptimisticStore {
    entries: HashMap<EntityId, OptimisticUpdate>,
}

impl OptimisticStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&OptimisticUpdate> {
        self.entries.get(id)
    }

    /// Preview a total normalized translation for `id`, replacing any prior entry.
    pub fn set_move(&mut self, id: EntityId, dx: f64, dy: f64, now: Instant) {
        self.entries.insert(id, OptimisticUpdate { change: Change::Move { dx, dy }, timestamp: now });
    }

    /// Preview replacement bounds for `id`, replacing any prior entry.
    pub fn set_resize(&mut self, id: EntityId, bounds: NormalizedRect, now: Instant) {
        self.entries.insert(id, OptimisticUpdate { change: Change::Resize { bounds }, timestamp: now });
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<OptimisticUpdate> {
        self.entries.remove(id)
    }

    /// The previewed translation for `id`, or zero when it has none.
    #[must_use]
    pub fn move_delta(&self, id: &EntityId) -> (f64, f64) {
        match self.entries.get(id).map(|u| u.change) {
            Some(Change::Move { dx, dy }) => (dx, dy),
            _ => (0.0, 0.0),
        }
    }

    /// Remove a resolved move write's contribution from `id`'s preview.
    ///
    /// Whatever remains belongs to newer, unsent changes; an entry that drops
    /// to zero is cleared. Resize previews are left alone.
    pub fn settle_move(&mut self, id: &EntityId, dx: f64, dy: f64) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let Change::Move { dx: pending_x, dy: pending_y } = entry.change else {
            return;
        };
        let rest_x = pending_x - dx;
        let rest_y = pending_y - dy;
        if rest_x.abs() < NORMALIZED_EPSILON && rest_y.abs() < NORMALIZED_EPSILON {
            self.entries.remove(id);
        } else {
            entry.change = Change::Move { dx: rest_x, dy: rest_y };
        }
    }

    /// Clear `id`'s resize preview if it is the one a resolved write carried.
    pub fn settle_resize(&mut self, id: &EntityId, bounds: NormalizedRect) {
        let matches = match self.entries.get(id).map(|u| u.change) {
            Some(Change::Resize { bounds: pending }) => same_rect(pending, bounds),
            _ => false,
        };
        if matches {
            self.entries.remove(id);
        }
    }

    /// Drop entries older than `ttl`, except ids in `keep` (the live gesture).
    ///
    /// Returns the ids that were collected.
    pub fn gc(&mut self, now: Instant, ttl: Duration, keep: &HashSet<EntityId>) -> Vec<EntityId> {
        let expired: Vec<EntityId> = self
            .entries
            .iter()
            .filter(|(id, u)| !keep.contains(*id) && now.saturating_duration_since(u.timestamp) > ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn same_rect(a: NormalizedRect, b: NormalizedRect) -> bool {
    (a.x - b.x).abs() < NORMALIZED_EPSILON
        && (a.y - b.y).abs() < NORMALIZED_EPSILON
        && (a.width - b.width).abs() < NORMALIZED_EPSILON
        && (a.height - b.height).abs() < NORMALIZED_EPSILON
}
