//! Differ → wire → reconciler scenarios, covering the protocol's
//! load-bearing properties end to end without sockets.

use driftnet_client::apply_delta;
use driftnet_server::diff_session;
use driftnet_shared::{ArchiveKind, EntityKind, RemovalReason, WorldRegistry};
use driftnet_test::{epsilon, loopback_session, ship};
use glam::Vec3;

#[test]
fn two_ticks_in_order_leave_the_client_at_the_final_position() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Prop, root).unwrap();
    // Entity starts at the origin.
    server.get_mut(id).unwrap().set_position(Vec3::ZERO);

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();

    // Tick 1: the entity is new to the client, full payload.
    let tick1 = ship(&diff_session(&server, &mut session), ArchiveKind::Binary);
    assert_eq!(tick1.updated.len(), 1);
    apply_delta(&tick1, &mut client);
    assert_eq!(client.get(id).unwrap().position(), Vec3::ZERO);

    // The entity moves one unit along x.
    server
        .get_mut(id)
        .unwrap()
        .set_position(Vec3::new(1.0, 0.0, 0.0));

    // Tick 2: only the position field rides along.
    let tick2 = ship(&diff_session(&server, &mut session), ArchiveKind::Binary);
    assert_eq!(tick2.updated.len(), 1);
    let update = tick2.updated.get(&id).unwrap();
    assert_eq!(update.values.len(), 1);

    apply_delta(&tick2, &mut client);
    // 1.0 sits on the quantization grid, so the match is exact.
    assert_eq!(client.get(id).unwrap().position(), Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn unchanged_worlds_produce_empty_deltas() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    for _ in 0..4 {
        server.create(EntityKind::Prop, root).unwrap();
    }

    let (mut session, _source) = loopback_session(1);
    let first = diff_session(&server, &mut session);
    assert_eq!(first.updated.len(), 4);

    for _ in 0..3 {
        let delta = diff_session(&server, &mut session);
        assert!(delta.is_empty());
    }
}

#[test]
fn changed_scalars_converge_within_the_codec_epsilon() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Prop, root).unwrap();

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );

    // An off-grid position on a low-priority entity gets quantized.
    let target = Vec3::new(17.03, -4.441, 1023.77);
    server.get_mut(id).unwrap().set_position(target);
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );

    let received = client.get(id).unwrap().position();
    assert!((received - target).abs().max_element() <= epsilon());
}

#[test]
fn destroyed_entities_disappear_from_the_client() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let keep = server.create(EntityKind::Prop, root).unwrap();
    let doomed = server.create(EntityKind::Light, root).unwrap();

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );
    assert!(client.contains(doomed));

    server.remove(doomed).unwrap();
    let delta = ship(&diff_session(&server, &mut session), ArchiveKind::Binary);
    assert_eq!(delta.deleted.get(&doomed), Some(&RemovalReason::Destroyed));
    assert!(!delta.updated.contains_key(&doomed));

    apply_delta(&delta, &mut client);
    assert!(!client.contains(doomed));
    assert!(client.contains(keep));
}

#[test]
fn reapplying_a_delta_changes_nothing() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Actor, root).unwrap();
    server
        .get_mut(id)
        .unwrap()
        .set_position(Vec3::new(3.5, 0.0, -8.25));

    let (mut session, _source) = loopback_session(1);
    let delta = ship(&diff_session(&server, &mut session), ArchiveKind::Binary);

    let mut client = WorldRegistry::new();
    apply_delta(&delta, &mut client);
    let once = client.get(id).unwrap().clone();

    apply_delta(&delta, &mut client);
    let twice = client.get(id).unwrap().clone();
    assert_eq!(once, twice);
    assert_eq!(client.len(), 2);

    // Deleted sets are idempotent too.
    server.remove(id).unwrap();
    let removal = ship(&diff_session(&server, &mut session), ArchiveKind::Binary);
    apply_delta(&removal, &mut client);
    apply_delta(&removal, &mut client);
    assert!(!client.contains(id));
}

#[test]
fn leaving_one_clients_filter_does_not_touch_the_other() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let shared = server.create(EntityKind::Prop, root).unwrap();
    let contested = server.create(EntityKind::Actor, root).unwrap();

    let (mut session_a, _source_a) = loopback_session(1);
    let (mut session_b, _source_b) = loopback_session(2);
    let mut client_a = WorldRegistry::new();
    let mut client_b = WorldRegistry::new();

    apply_delta(
        &ship(&diff_session(&server, &mut session_a), ArchiveKind::Binary),
        &mut client_a,
    );
    apply_delta(
        &ship(&diff_session(&server, &mut session_b), ArchiveKind::Binary),
        &mut client_b,
    );

    // `contested` leaves A's filter; B keeps seeing everything.
    session_a.set_scope([shared].into_iter().collect());

    let delta_a = ship(&diff_session(&server, &mut session_a), ArchiveKind::Binary);
    assert_eq!(
        delta_a.deleted.get(&contested),
        Some(&RemovalReason::OutOfScope)
    );

    let delta_b = ship(&diff_session(&server, &mut session_b), ArchiveKind::Binary);
    assert!(!delta_b.deleted.contains_key(&contested));

    apply_delta(&delta_a, &mut client_a);
    apply_delta(&delta_b, &mut client_b);
    assert!(!client_a.contains(contested));
    assert!(client_b.contains(contested));
    // The entity still lives on the server.
    assert!(server.contains(contested));
}
