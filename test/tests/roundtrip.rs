//! Envelope and payload round-trip properties: quantized fields land
//! within the codec epsilon, priority-bypassed fields land exactly.

use driftnet_client::apply_delta;
use driftnet_server::diff_session;
use driftnet_shared::{ArchiveKind, EntityKind, NetPriority, WorldRegistry};
use driftnet_test::{epsilon, loopback_session, ship};
use glam::Vec3;

// Deliberately off the 1/16 quantization grid.
const OFF_GRID: Vec3 = Vec3::new(1.2345678, -2.7182817, 3.1415927);

#[test]
fn decoded_deltas_reproduce_the_updated_id_set() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let ids = [
        server.create(EntityKind::Prop, root).unwrap(),
        server.create(EntityKind::Actor, root).unwrap(),
        server.create(EntityKind::Light, root).unwrap(),
    ];

    let (mut session, _source) = loopback_session(1);
    let delta = diff_session(&server, &mut session);
    for archive in [ArchiveKind::Binary, ArchiveKind::Text] {
        let decoded = ship(&delta, archive);
        let sent: Vec<_> = delta.updated.keys().collect();
        let received: Vec<_> = decoded.updated.keys().collect();
        assert_eq!(sent, received);
        assert!(ids.iter().all(|id| decoded.updated.contains_key(id)));
    }
}

#[test]
fn low_priority_floats_arrive_within_epsilon() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Prop, root).unwrap();
    {
        let entity = server.get_mut(id).unwrap();
        entity.set_position(OFF_GRID);
        entity.set_priority(NetPriority::Low);
    }

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );

    let received = client.get(id).unwrap().position();
    let error = (received - OFF_GRID).abs().max_element();
    assert!(error <= epsilon(), "error {error} exceeds epsilon");
    // And it genuinely was quantized, not passed through.
    assert_ne!(received, OFF_GRID);
}

#[test]
fn top_priority_floats_arrive_bit_exact() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Actor, root).unwrap();
    {
        let entity = server.get_mut(id).unwrap();
        entity.set_position(OFF_GRID);
        // The locally-controlled actor: always bypasses quantization.
        entity.set_priority(NetPriority::Local);
    }

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );

    let received = client.get(id).unwrap();
    assert_eq!(received.position(), OFF_GRID);
    assert_eq!(received.priority(), NetPriority::Local);
}

#[test]
fn high_priority_unlocks_raw_floats_for_high_threshold_fields() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Prop, root).unwrap();
    {
        let entity = server.get_mut(id).unwrap();
        entity.set_position(OFF_GRID);
        // position is raw at High and above.
        entity.set_priority(NetPriority::High);
    }

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Binary),
        &mut client,
    );
    assert_eq!(client.get(id).unwrap().position(), OFF_GRID);
}

#[test]
fn text_archive_carries_a_whole_session_tick() {
    let mut server = WorldRegistry::new();
    let root = server.root();
    let id = server.create(EntityKind::Light, root).unwrap();
    server
        .get_mut(id)
        .unwrap()
        .set_position(Vec3::new(-100.5, 42.0, 7.25));

    let (mut session, _source) = loopback_session(1);
    let mut client = WorldRegistry::new();
    apply_delta(
        &ship(&diff_session(&server, &mut session), ArchiveKind::Text),
        &mut client,
    );
    assert_eq!(
        client.get(id).unwrap().position(),
        Vec3::new(-100.5, 42.0, 7.25)
    );
}

#[cfg(feature = "zstd_support")]
#[test]
fn compressed_envelopes_round_trip() {
    use driftnet_shared::{open, seal, CompressionMode, Decoder, Encoder, Message};

    let mut server = WorldRegistry::new();
    let root = server.root();
    for _ in 0..20 {
        server.create(EntityKind::Prop, root).unwrap();
    }
    let (mut session, _source) = loopback_session(1);
    let delta = diff_session(&server, &mut session);

    let mut encoder = Encoder::try_new(CompressionMode::Default(3)).unwrap();
    let mut decoder = Decoder::try_new(CompressionMode::Default(3)).unwrap();

    let message = Message::GameState(delta.clone());
    let bytes = seal(&message, ArchiveKind::Binary, Some(&mut encoder)).unwrap();
    match open(&bytes, Some(&mut decoder)).unwrap() {
        Message::GameState(decoded) => {
            assert_eq!(decoded.updated.len(), delta.updated.len())
        }
        other => panic!("expected game state, decoded {other:?}"),
    }
}
