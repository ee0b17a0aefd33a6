use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::objects::ObjectId;

/// Shared flag for a delayed trigger. Clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct PendingTrigger {
    object: ObjectId,
    remaining_seconds: f32,
    token: CancellationToken,
}

/// Which triggers the player stands in, and the countdowns they started.
#[derive(Debug, Default)]
pub(crate) struct TriggerTracker {
    inside: BTreeSet<ObjectId>,
    pending: Vec<PendingTrigger>,
}

impl TriggerTracker {
    pub(crate) fn is_inside(&self, object: ObjectId) -> bool {
        self.inside.contains(&object)
    }

    pub(crate) fn inside(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.inside.iter().copied()
    }

    /// Returns false when the player was already inside.
    pub(crate) fn enter(&mut self, object: ObjectId) -> bool {
        self.inside.insert(object)
    }

    /// Returns false when the player was not inside. Leaving cancels any countdown.
    pub(crate) fn exit(&mut self, object: ObjectId) -> bool {
        self.cancel(object);
        self.inside.remove(&object)
    }

    pub(crate) fn schedule(&mut self, object: ObjectId, delay_seconds: f32) -> CancellationToken {
        self.cancel(object);
        let token = CancellationToken::default();
        self.pending.push(PendingTrigger {
            object,
            remaining_seconds: delay_seconds,
            token: token.clone(),
        });
        token
    }

    pub(crate) fn cancel(&mut self, object: ObjectId) {
        for pending in self.pending.iter().filter(|pending| pending.object == object) {
            pending.token.cancel();
        }
        self.pending.retain(|pending| pending.object != object);
    }

    /// Forgets the object entirely, as on deactivation.
    pub(crate) fn forget(&mut self, object: ObjectId) {
        self.cancel(object);
        self.inside.remove(&object);
    }

    pub(crate) fn clear(&mut self) {
        for pending in &self.pending {
            pending.token.cancel();
        }
        self.pending.clear();
        self.inside.clear();
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advances every countdown and returns the objects whose delay ran out, in schedule order.
    pub(crate) fn tick(&mut self, dt: f32) -> Vec<ObjectId> {
        let mut due = Vec::new();
        self.pending.retain_mut(|pending| {
            if pending.token.is_cancelled() {
                return false;
            }
            pending.remaining_seconds -= dt;
            if pending.remaining_seconds <= 0.0 {
                due.push(pending.object);
                return false;
            }
            true
        });
        due
    }
}
