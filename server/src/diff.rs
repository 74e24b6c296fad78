//! Snapshot differ: computes, for one client, the minimal set of created,
//! updated and deleted entity ids between that client's last-acknowledged
//! snapshots and the authoritative registry. Output is sized by churn, not
//! by world size. That is the core bandwidth guarantee of the protocol.

use std::collections::HashSet;

use driftnet_shared::{
    field_count, record_changes, DeltaMessage, DiffMask, EntityId, EntityUpdate, RemovalReason,
    WorldRegistry,
};

use crate::session::ClientSession;

/// Runs the change-tracker in write mode for every entity this client can
/// currently perceive.
///
/// On a first sync the full authoritative set goes out unfiltered.
/// Afterwards the set is intersected with the session's visibility filter:
/// an entity outside the filter is treated as absent this tick even if it
/// still exists unchanged, which is what stops updates for things the
/// client can no longer perceive. Snapshot-only ids move to `deleted`,
/// tagged with whether the entity was destroyed or merely left the filter,
/// and their snapshot is dropped so a later reappearance counts as a fresh
/// create.
pub fn diff_session(world: &WorldRegistry, session: &mut ClientSession) -> DeltaMessage {
    let mut delta = DeltaMessage::new();
    let first_sync = session.snapshots.is_empty();

    let candidates: HashSet<EntityId> = world
        .replicable_ids()
        .filter(|id| first_sync || session.scope_has(*id))
        .collect();

    // Walk in id order so wire output is deterministic.
    for id in world.replicable_ids() {
        if !candidates.contains(&id) {
            continue;
        }
        let Some(entity) = world.get(id) else {
            continue;
        };
        match session.snapshots.get_mut(&id) {
            Some(snapshot) => {
                let mut mask = DiffMask::new(field_count(entity.kind()));
                if record_changes(snapshot, entity, &mut mask) {
                    delta
                        .updated
                        .insert(id, EntityUpdate::capture(snapshot, mask));
                }
            }
            None => {
                // New to this client: full clone, all fields present.
                let snapshot = entity.clone();
                delta.updated.insert(id, EntityUpdate::full(&snapshot));
                session.snapshots.insert(id, snapshot);
            }
        }
    }

    let stale: Vec<EntityId> = session
        .snapshots
        .keys()
        .copied()
        .filter(|id| !candidates.contains(id))
        .collect();
    for id in stale {
        session.snapshots.remove(&id);
        let reason = if world.contains(id) {
            RemovalReason::OutOfScope
        } else {
            RemovalReason::Destroyed
        };
        delta.deleted.insert(id, reason);
    }

    debug_assert!(
        delta.updated.keys().all(|id| !delta.deleted.contains_key(id)),
        "updated and deleted must be disjoint"
    );
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftnet_shared::{loopback, ConnectionId, EntityKind};
    use glam::Vec3;

    fn session() -> ClientSession {
        let (sink, _source) = loopback();
        ClientSession::new(ConnectionId::new(1), Box::new(sink))
    }

    fn world_with_prop() -> (WorldRegistry, EntityId) {
        let mut world = WorldRegistry::new();
        let root = world.root();
        let id = world.create(EntityKind::Prop, root).unwrap();
        (world, id)
    }

    #[test]
    fn first_sync_sends_everything_with_full_masks() {
        let (mut world, _) = world_with_prop();
        let root = world.root();
        world.create(EntityKind::Actor, root).unwrap();

        let mut session = session();
        let delta = diff_session(&world, &mut session);

        assert_eq!(delta.updated.len(), 2);
        assert!(delta.deleted.is_empty());
        for update in delta.updated.values() {
            assert_eq!(
                update.mask,
                DiffMask::full(field_count(update.kind)),
            );
        }
        assert_eq!(session.snapshots.len(), 2);
    }

    #[test]
    fn equal_states_diff_to_nothing() {
        let (world, _) = world_with_prop();
        let mut session = session();

        let _ = diff_session(&world, &mut session);
        let second = diff_session(&world, &mut session);
        assert!(second.updated.is_empty());
        assert!(second.deleted.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn one_changed_scalar_yields_one_masked_update() {
        let (mut world, id) = world_with_prop();
        let mut session = session();
        let _ = diff_session(&world, &mut session);

        world
            .get_mut(id)
            .unwrap()
            .set_position(Vec3::new(2.0, 0.0, 0.0));
        let delta = diff_session(&world, &mut session);

        assert_eq!(delta.updated.len(), 1);
        let update = delta.updated.get(&id).unwrap();
        // Only the position bit is flagged and only one value rides along.
        assert_eq!(update.mask.to_bits(), 1);
        assert_eq!(update.values.len(), 1);
    }

    #[test]
    fn destroyed_entities_are_reported_as_destroyed() {
        let (mut world, id) = world_with_prop();
        let mut session = session();
        let _ = diff_session(&world, &mut session);

        world.remove(id).unwrap();
        let delta = diff_session(&world, &mut session);

        assert!(delta.updated.is_empty());
        assert_eq!(delta.deleted.get(&id), Some(&RemovalReason::Destroyed));
        assert!(session.snapshots.is_empty());
    }

    #[test]
    fn leaving_the_filter_is_reported_as_out_of_scope() {
        let (mut world, id) = world_with_prop();
        let root = world.root();
        let kept = world.create(EntityKind::Light, root).unwrap();

        let mut session = session();
        let _ = diff_session(&world, &mut session);

        // Filter now admits only `kept`; `id` still exists on the server.
        session.set_scope([kept].into_iter().collect());
        let delta = diff_session(&world, &mut session);

        assert_eq!(delta.deleted.get(&id), Some(&RemovalReason::OutOfScope));
        assert!(!delta.updated.contains_key(&id));
        assert!(world.contains(id));
    }

    #[test]
    fn reentering_the_filter_recreates_with_a_full_mask() {
        let (mut world, id) = world_with_prop();
        world
            .get_mut(id)
            .unwrap()
            .set_position(Vec3::new(9.0, 0.0, 0.0));

        let mut session = session();
        let _ = diff_session(&world, &mut session);

        session.set_scope(HashSet::new());
        let _ = diff_session(&world, &mut session);

        session.scope_include(id);
        let delta = diff_session(&world, &mut session);
        let update = delta.updated.get(&id).unwrap();
        assert_eq!(update.mask, DiffMask::full(field_count(update.kind)));
    }

    #[test]
    fn first_sync_ignores_the_visibility_filter() {
        let (world, id) = world_with_prop();
        let mut session = session();
        session.set_scope(HashSet::new());

        let delta = diff_session(&world, &mut session);
        assert!(delta.updated.contains_key(&id));
    }
}
