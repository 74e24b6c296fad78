//! Process entry point. A role flag selects the server or client loop;
//! everything interesting lives in the library crates.

use std::error::Error;
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use log::info;

use driftnet_client::{ClientConfig, ClientEvent, GameClient};
use driftnet_server::{GameServer, InputEvent, LogSink, ServerConfig};
use driftnet_shared::{ArchiveKind, EntityKind, NetPriority, WorldRegistry};

#[derive(Parser)]
#[command(name = "driftnet", about = "Authoritative-state replication demo", version)]
struct Cli {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Run the authoritative server.
    Server(ServerArgs),
    /// Connect to a running server.
    Client(ClientArgs),
}

#[derive(Args)]
struct ServerArgs {
    #[arg(long, default_value_t = 5555)]
    port: u16,
    /// Minimum milliseconds between state broadcasts.
    #[arg(long = "broadcast-ms", default_value_t = 50)]
    broadcast_ms: u64,
    /// Marshal envelopes with the text archive instead of binary.
    #[arg(long)]
    text_archive: bool,
}

#[derive(Args)]
struct ClientArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 5555)]
    port: u16,
    /// Display name announced to the server.
    #[arg(long, default_value = "pilot")]
    name: String,
    /// Skip waiting for the first roster before entering the loop.
    #[arg(long)]
    instant_start: bool,
    /// Marshal envelopes with the text archive instead of binary.
    #[arg(long)]
    text_archive: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let result = match cli.role {
        Role::Server(args) => run_server(args),
        Role::Client(args) => run_client(args),
    };
    if let Err(error) = result {
        eprintln!("fatal: {error}");
        std::process::exit(1);
    }
}

/// A small world to replicate: an arena with scenery, a patrol actor and a
/// lamp. The simulate step flies the actor in a circle and steers it with
/// WASD input from any client.
fn demo_world() -> (WorldRegistry, driftnet_shared::EntityId) {
    let mut world = WorldRegistry::new();
    let root = world.root();
    let arena = world.create(EntityKind::Group, root).expect("root exists");
    for i in 0..3 {
        let prop = world.create(EntityKind::Prop, arena).expect("arena exists");
        let entity = world.get_mut(prop).expect("just created");
        entity.set_position(Vec3::new(i as f32 * 8.0 - 8.0, 0.0, -12.0));
    }
    let lamp = world.create(EntityKind::Light, arena).expect("arena exists");
    world
        .get_mut(lamp)
        .expect("just created")
        .set_position(Vec3::new(0.0, 6.0, 0.0));

    let patrol = world.create(EntityKind::Actor, arena).expect("arena exists");
    let entity = world.get_mut(patrol).expect("just created");
    entity.set_animated(true);
    entity.set_priority(NetPriority::Medium);
    (world, patrol)
}

fn run_server(args: ServerArgs) -> Result<(), Box<dyn Error>> {
    let config = ServerConfig {
        port: args.port,
        broadcast_interval: Duration::from_millis(args.broadcast_ms),
        archive: if args.text_archive {
            ArchiveKind::Text
        } else {
            ArchiveKind::Binary
        },
        ..ServerConfig::default()
    };

    let (world, patrol) = demo_world();
    let mut clock = 0.0f32;
    let mut steer = Vec3::ZERO;
    let simulate = Box::new(
        move |world: &mut WorldRegistry, inputs: &[InputEvent], elapsed: Duration| {
            clock += elapsed.as_secs_f32();
            for input in inputs {
                if let InputEvent::Key { input, .. } = input {
                    if !input.pressed {
                        continue;
                    }
                    match input.code {
                        87 => steer.z -= 1.0, // W
                        83 => steer.z += 1.0, // S
                        65 => steer.x -= 1.0, // A
                        68 => steer.x += 1.0, // D
                        _ => {}
                    }
                }
            }
            if let Some(actor) = world.get_mut(patrol) {
                let orbit = Vec3::new(10.0 * clock.cos(), 0.0, 10.0 * clock.sin());
                actor.set_position(orbit + steer);
                actor.set_rotation(Vec3::new(0.0, clock.to_degrees(), 0.0));
            }
        },
    );

    let mut handle = GameServer::spawn(config, world, simulate, Box::new(LogSink))?;
    info!("server up on {}; type to chat, /cmd for script, `quit` to stop", handle.local_addr());

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if let Some(command) = line.strip_prefix('/') {
            handle.run_command(command);
        } else {
            handle.broadcast_chat(line);
        }
    }

    handle.shutdown();
    Ok(())
}

fn run_client(args: ClientArgs) -> Result<(), Box<dyn Error>> {
    let config = ClientConfig {
        host: args.host,
        port: args.port,
        name: args.name,
        archive: if args.text_archive {
            ArchiveKind::Text
        } else {
            ArchiveKind::Binary
        },
        ..ClientConfig::default()
    };
    let mut client = GameClient::connect(config)?;

    if !args.instant_start {
        // Pre-game screen: wait for the first roster.
        let deadline = Instant::now() + Duration::from_secs(10);
        'roster: while Instant::now() < deadline {
            for event in client.update() {
                if matches!(event, ClientEvent::Roster(_)) {
                    break 'roster;
                }
                if matches!(event, ClientEvent::Disconnected) {
                    return Err("server hung up before the session started".into());
                }
            }
            thread::sleep(Duration::from_millis(16));
        }
    }

    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    info!("in session; type to chat, /cmd for script, `quit` to leave");
    loop {
        for event in client.update() {
            match event {
                ClientEvent::Roster(roster) => {
                    let names: Vec<&str> =
                        roster.iter().map(|entry| entry.name.as_str()).collect();
                    println!("* roster: {}", names.join(", "));
                }
                ClientEvent::Chat { text } => println!("{text}"),
                ClientEvent::KillShot(shot) => {
                    println!("* {} took out {}", shot.actor, shot.target)
                }
                ClientEvent::World(world_event) => {
                    log::debug!("world event: {world_event:?}");
                }
                ClientEvent::Disconnected => {
                    println!("* connection closed");
                    return Ok(());
                }
            }
        }

        match line_rx.try_recv() {
            Ok(line) => {
                let line = line.trim();
                if line == "quit" || line == "exit" {
                    client.disconnect()?;
                    return Ok(());
                }
                if let Some(command) = line.strip_prefix('/') {
                    client.send_command(command)?;
                } else if !line.is_empty() {
                    client.send_chat(line)?;
                }
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                client.disconnect()?;
                return Ok(());
            }
        }

        thread::sleep(Duration::from_millis(16));
    }
}
