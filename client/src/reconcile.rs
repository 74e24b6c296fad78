//! Client reconciler: applies a decoded delta to the local entity graph.
//!
//! Application is idempotent per message: updates through the change
//! tracker converge, spawns are skipped when the id already exists, and
//! deleting an absent id is a no-op. Across messages, ordering comes from
//! the reliable ordered channel: a later update for an id assumes the
//! message that introduced it was already applied.

use log::{debug, warn};

use driftnet_shared::{
    apply_update, DeltaMessage, EntityId, RemovalReason, WorldRegistry,
};

/// What reconciliation did to the local graph, for the embedding
/// application (renderer, audio) to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    Spawned(EntityId),
    Updated(EntityId),
    Removed(EntityId, RemovalReason),
}

/// Applies `delta` to `world`. Within one message the order between
/// `updated` and `deleted` does not matter; the two sets are disjoint.
pub fn apply_delta(delta: &DeltaMessage, world: &mut WorldRegistry) -> Vec<WorldEvent> {
    let mut events = Vec::new();

    for (id, update) in &delta.updated {
        if world.contains(*id) {
            if let Some(entity) = world.get_mut(*id) {
                apply_update(entity, update);
                events.push(WorldEvent::Updated(*id));
            }
        } else {
            // Unknown id: instantiate through the kind-keyed factory and
            // adopt the wire id.
            match world.insert_replicated(*id, update.kind) {
                Ok(()) => {
                    if let Some(entity) = world.get_mut(*id) {
                        apply_update(entity, update);
                    }
                    debug!("spawned {} as {:?}", id, update.kind);
                    events.push(WorldEvent::Spawned(*id));
                }
                Err(error) => warn!("could not spawn {id}: {error}"),
            }
        }
    }

    for (id, reason) in &delta.deleted {
        if world.contains(*id) {
            match world.remove(*id) {
                Ok(_) => events.push(WorldEvent::Removed(*id, *reason)),
                Err(error) => warn!("could not remove {id}: {error}"),
            }
        }
        // Already absent: idempotent no-op.
    }

    events
}
