//! Whole-stack smoke test: real TCP sockets, real threads, one client
//! joining, receiving state, chatting and leaving.

use std::time::{Duration, Instant};

use driftnet_client::{ClientConfig, ClientEvent, GameClient};
use driftnet_server::{GameServer, LogSink, ServerConfig};
use driftnet_shared::{EntityKind, WorldRegistry};
use glam::Vec3;

fn wait_until(deadline: Instant, mut done: impl FnMut() -> bool) -> bool {
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn tcp_session_joins_receives_and_leaves() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut world = WorldRegistry::new();
    let root = world.root();
    let mover = world.create(EntityKind::Actor, root).unwrap();
    let _scenery = world.create(EntityKind::Prop, root).unwrap();

    let mut clock = 0.0f32;
    let simulate = Box::new(
        move |world: &mut WorldRegistry, _inputs: &[driftnet_server::InputEvent], elapsed: Duration| {
            clock += elapsed.as_secs_f32();
            if let Some(actor) = world.get_mut(mover) {
                actor.set_position(Vec3::new(clock, 0.0, 0.0));
            }
        },
    );

    let config = ServerConfig {
        port: 0, // ephemeral
        broadcast_interval: Duration::from_millis(20),
        ..ServerConfig::default()
    };
    let handle = GameServer::spawn(config, world, simulate, Box::new(LogSink))
        .expect("server should bind an ephemeral port");
    let addr = handle.local_addr();

    let client_config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
        name: "smoke".to_string(),
        ..ClientConfig::default()
    };
    let mut client = GameClient::connect(client_config).expect("client should connect");

    let mut saw_roster = false;
    let mut saw_spawn = false;
    let mut chat_line = None;
    let deadline = Instant::now() + Duration::from_secs(5);
    let synced = wait_until(deadline, || {
        for event in client.update() {
            match event {
                ClientEvent::Roster(roster) => {
                    saw_roster = roster.iter().any(|entry| entry.name == "smoke");
                }
                ClientEvent::World(_) => saw_spawn = true,
                ClientEvent::Chat { text } => chat_line = Some(text),
                _ => {}
            }
        }
        saw_roster && saw_spawn
    });
    assert!(synced, "client never synced (roster: {saw_roster}, spawn: {saw_spawn})");

    // Both replicated entities (and the local root) are present.
    assert!(client.world().len() >= 3);

    // Chat makes the full trip: client -> server -> broadcast -> client.
    client.send_chat("ping").expect("chat send");
    let chatted = wait_until(Instant::now() + Duration::from_secs(5), || {
        for event in client.update() {
            if let ClientEvent::Chat { text } = event {
                chat_line = Some(text);
            }
        }
        chat_line.as_deref() == Some("smoke: ping")
    });
    assert!(chatted, "chat never echoed: {chat_line:?}");

    // The moving actor keeps updating.
    let before = client.world().get(mover).unwrap().position().x;
    let moved = wait_until(Instant::now() + Duration::from_secs(5), || {
        let _ = client.update();
        client
            .world()
            .get(mover)
            .is_some_and(|actor| actor.position().x > before)
    });
    assert!(moved, "actor never advanced past {before}");

    // Clean departure: disconnect waits for the ack, the server forgets us.
    client.disconnect().expect("disconnect");
    let emptied = wait_until(Instant::now() + Duration::from_secs(5), || {
        handle.session_count() == 0
    });
    assert!(emptied, "server still holds a session");

    handle.shutdown();
}
