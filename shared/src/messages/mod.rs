//! Wire message taxonomy. Every message starts with its type tag; decode
//! reports unknown tags as errors so the caller can drop the payload.

pub mod delta;

use driftnet_archive::{ArchiveError, ArchiveRead, ArchiveWrite, Marshal};
use glam::Vec3;

use crate::types::ConnectionId;
use crate::wire::{read_vec3, write_vec3};
use self::delta::DeltaMessage;

/// Sent by the client immediately after connecting: display name plus the
/// schema fingerprint of the build it was compiled against.
#[derive(Clone, Debug, PartialEq)]
pub struct Ready {
    pub name: String,
    pub schema: u32,
}

/// Keyboard transition event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub code: u16,
    pub pressed: bool,
    pub modifiers: u8,
}

/// Pointer event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseInput {
    pub x: f32,
    pub y: f32,
    pub mode: u8,
    pub button: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptCommand {
    pub text: String,
}

/// Fire-and-forget cosmetic event; carries no authoritative state.
#[derive(Clone, Debug, PartialEq)]
pub struct KillShot {
    pub target: String,
    pub actor: String,
    pub position: Vec3,
    pub force: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Ready(Ready),
    Disconnect { connection: ConnectionId },
    DisconnectAck,
    Key(KeyInput),
    Mouse(MouseInput),
    Chat(Chat),
    ScriptCommand(ScriptCommand),
    KillShot(KillShot),
    GameState(DeltaMessage),
}

impl Marshal for Message {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        match self {
            Message::Ready(ready) => {
                ar.write_u8(0);
                ar.write_str(&ready.name);
                ar.write_u32(ready.schema);
            }
            Message::Disconnect { connection } => {
                ar.write_u8(1);
                connection.marshal(ar);
            }
            Message::DisconnectAck => {
                ar.write_u8(2);
            }
            Message::Key(key) => {
                ar.write_u8(3);
                ar.write_u16(key.code);
                ar.write_bool(key.pressed);
                ar.write_u8(key.modifiers);
            }
            Message::Mouse(mouse) => {
                ar.write_u8(4);
                ar.write_f32(mouse.x);
                ar.write_f32(mouse.y);
                ar.write_u8(mouse.mode);
                ar.write_u8(mouse.button);
            }
            Message::Chat(chat) => {
                ar.write_u8(5);
                ar.write_str(&chat.text);
            }
            Message::ScriptCommand(command) => {
                ar.write_u8(6);
                ar.write_str(&command.text);
            }
            Message::KillShot(shot) => {
                ar.write_u8(7);
                ar.write_str(&shot.target);
                ar.write_str(&shot.actor);
                write_vec3(ar, shot.position);
                write_vec3(ar, shot.force);
            }
            Message::GameState(delta) => {
                ar.write_u8(8);
                delta.marshal(ar);
            }
        }
    }

    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        match ar.read_u8()? {
            0 => Ok(Message::Ready(Ready {
                name: ar.read_string()?,
                schema: ar.read_u32()?,
            })),
            1 => Ok(Message::Disconnect {
                connection: ConnectionId::unmarshal(ar)?,
            }),
            2 => Ok(Message::DisconnectAck),
            3 => Ok(Message::Key(KeyInput {
                code: ar.read_u16()?,
                pressed: ar.read_bool()?,
                modifiers: ar.read_u8()?,
            })),
            4 => Ok(Message::Mouse(MouseInput {
                x: ar.read_f32()?,
                y: ar.read_f32()?,
                mode: ar.read_u8()?,
                button: ar.read_u8()?,
            })),
            5 => Ok(Message::Chat(Chat {
                text: ar.read_string()?,
            })),
            6 => Ok(Message::ScriptCommand(ScriptCommand {
                text: ar.read_string()?,
            })),
            7 => Ok(Message::KillShot(KillShot {
                target: ar.read_string()?,
                actor: ar.read_string()?,
                position: read_vec3(ar)?,
                force: read_vec3(ar)?,
            })),
            8 => Ok(Message::GameState(DeltaMessage::unmarshal(ar)?)),
            tag => Err(ArchiveError::UnknownTag {
                what: "message",
                tag,
            }),
        }
    }
}
