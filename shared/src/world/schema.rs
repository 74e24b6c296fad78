//! Replicated field schema.
//!
//! Each entity kind owns a fixed, ordered list of field descriptors that is
//! built into the binary and shared verbatim by the differ, the encoder and
//! the decoder. Bit *i* of an attribute mask always refers to the *i*-th
//! descriptor of the owning kind, and base fields always precede
//! kind-specific ones; this order is the wire contract. The fingerprint
//! below is exchanged during the ready handshake so two builds with
//! divergent schemas refuse each other instead of silently corrupting
//! unrelated fields.

use glam::Vec3;

use crate::constants::SCHEMA_VERSION;
use crate::world::entity::{Entity, EntityKind, KindState, NetPriority};

/// A replicated field value in transit.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Vec3(Vec3),
    Float(f32),
    Bool(bool),
    Uint(u16),
}

/// Wire type of a field; drives how the codec reads it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Vec3,
    Float,
    Bool,
    Uint,
}

/// One entry of a kind's ordered field list.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    /// Minimum priority tier at which float content is sent raw instead of
    /// quantized. Irrelevant for `Bool`/`Uint` fields.
    pub raw_at: NetPriority,
    pub get: fn(&Entity) -> FieldValue,
    pub set: fn(&mut Entity, FieldValue),
}

fn get_position(e: &Entity) -> FieldValue {
    FieldValue::Vec3(e.position())
}
fn set_position(e: &mut Entity, v: FieldValue) {
    let FieldValue::Vec3(position) = v else { return };
    e.set_position(position);
}

fn get_rotation(e: &Entity) -> FieldValue {
    FieldValue::Vec3(e.rotation())
}
fn set_rotation(e: &mut Entity, v: FieldValue) {
    let FieldValue::Vec3(rotation) = v else { return };
    e.set_rotation(rotation);
}

fn get_scale(e: &Entity) -> FieldValue {
    FieldValue::Vec3(e.scale())
}
fn set_scale(e: &mut Entity, v: FieldValue) {
    let FieldValue::Vec3(scale) = v else { return };
    e.set_scale(scale);
}

fn get_visible(e: &Entity) -> FieldValue {
    FieldValue::Bool(e.visible())
}
fn set_visible(e: &mut Entity, v: FieldValue) {
    let FieldValue::Bool(visible) = v else { return };
    e.set_visible(visible);
}

fn get_animated(e: &Entity) -> FieldValue {
    FieldValue::Bool(e.animated())
}
fn set_animated(e: &mut Entity, v: FieldValue) {
    let FieldValue::Bool(animated) = v else { return };
    e.set_animated(animated);
}

fn get_priority(e: &Entity) -> FieldValue {
    FieldValue::Uint(e.priority().tag() as u16)
}
fn set_priority(e: &mut Entity, v: FieldValue) {
    let FieldValue::Uint(tag) = v else { return };
    if let Some(priority) = NetPriority::from_tag(tag as u8) {
        e.set_priority(priority);
    }
}

fn get_prop_model(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Prop { model } => FieldValue::Uint(*model),
        _ => FieldValue::Uint(0),
    }
}
fn set_prop_model(e: &mut Entity, v: FieldValue) {
    let FieldValue::Uint(model) = v else { return };
    if let KindState::Prop { model: m } = e.state_mut() {
        *m = model;
    }
}

fn get_actor_model(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Actor { model, .. } => FieldValue::Uint(*model),
        _ => FieldValue::Uint(0),
    }
}
fn set_actor_model(e: &mut Entity, v: FieldValue) {
    let FieldValue::Uint(model) = v else { return };
    if let KindState::Actor { model: m, .. } = e.state_mut() {
        *m = model;
    }
}

fn get_actor_heading(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Actor { heading, .. } => FieldValue::Float(*heading),
        _ => FieldValue::Float(0.0),
    }
}
fn set_actor_heading(e: &mut Entity, v: FieldValue) {
    let FieldValue::Float(heading) = v else { return };
    if let KindState::Actor { heading: h, .. } = e.state_mut() {
        *h = heading;
    }
}

fn get_actor_frame(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Actor { frame, .. } => FieldValue::Float(*frame),
        _ => FieldValue::Float(0.0),
    }
}
fn set_actor_frame(e: &mut Entity, v: FieldValue) {
    let FieldValue::Float(frame) = v else { return };
    if let KindState::Actor { frame: f, .. } = e.state_mut() {
        *f = frame;
    }
}

fn get_light_color(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Light { color, .. } => FieldValue::Vec3(*color),
        _ => FieldValue::Vec3(Vec3::ONE),
    }
}
fn set_light_color(e: &mut Entity, v: FieldValue) {
    let FieldValue::Vec3(color) = v else { return };
    if let KindState::Light { color: c, .. } = e.state_mut() {
        *c = color;
    }
}

fn get_light_intensity(e: &Entity) -> FieldValue {
    match e.state() {
        KindState::Light { intensity, .. } => FieldValue::Float(*intensity),
        _ => FieldValue::Float(1.0),
    }
}
fn set_light_intensity(e: &mut Entity, v: FieldValue) {
    let FieldValue::Float(intensity) = v else { return };
    if let KindState::Light { intensity: i, .. } = e.state_mut() {
        *i = intensity;
    }
}

static BASE_FIELDS: [FieldDescriptor; 6] = [
    FieldDescriptor {
        name: "position",
        ty: FieldType::Vec3,
        raw_at: NetPriority::High,
        get: get_position,
        set: set_position,
    },
    FieldDescriptor {
        name: "rotation",
        ty: FieldType::Vec3,
        raw_at: NetPriority::High,
        get: get_rotation,
        set: set_rotation,
    },
    FieldDescriptor {
        name: "scale",
        ty: FieldType::Vec3,
        raw_at: NetPriority::Local,
        get: get_scale,
        set: set_scale,
    },
    FieldDescriptor {
        name: "visible",
        ty: FieldType::Bool,
        raw_at: NetPriority::Local,
        get: get_visible,
        set: set_visible,
    },
    FieldDescriptor {
        name: "animated",
        ty: FieldType::Bool,
        raw_at: NetPriority::Local,
        get: get_animated,
        set: set_animated,
    },
    FieldDescriptor {
        name: "priority",
        ty: FieldType::Uint,
        raw_at: NetPriority::Local,
        get: get_priority,
        set: set_priority,
    },
];

static GROUP_FIELDS: [FieldDescriptor; 0] = [];

static PROP_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor {
    name: "model",
    ty: FieldType::Uint,
    raw_at: NetPriority::Local,
    get: get_prop_model,
    set: set_prop_model,
}];

static ACTOR_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor {
        name: "model",
        ty: FieldType::Uint,
        raw_at: NetPriority::Local,
        get: get_actor_model,
        set: set_actor_model,
    },
    FieldDescriptor {
        name: "heading",
        ty: FieldType::Float,
        raw_at: NetPriority::High,
        get: get_actor_heading,
        set: set_actor_heading,
    },
    FieldDescriptor {
        name: "frame",
        ty: FieldType::Float,
        raw_at: NetPriority::Medium,
        get: get_actor_frame,
        set: set_actor_frame,
    },
];

static LIGHT_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor {
        name: "color",
        ty: FieldType::Vec3,
        raw_at: NetPriority::Medium,
        get: get_light_color,
        set: set_light_color,
    },
    FieldDescriptor {
        name: "intensity",
        ty: FieldType::Float,
        raw_at: NetPriority::Medium,
        get: get_light_intensity,
        set: set_light_intensity,
    },
];

fn derived_fields(kind: EntityKind) -> &'static [FieldDescriptor] {
    match kind {
        EntityKind::Group => &GROUP_FIELDS,
        EntityKind::Prop => &PROP_FIELDS,
        EntityKind::Actor => &ACTOR_FIELDS,
        EntityKind::Light => &LIGHT_FIELDS,
    }
}

/// Ordered field walk for one kind: base fields first, then derived.
pub fn kind_schema(kind: EntityKind) -> impl Iterator<Item = &'static FieldDescriptor> {
    BASE_FIELDS.iter().chain(derived_fields(kind).iter())
}

/// Number of mask bits a kind occupies.
pub fn field_count(kind: EntityKind) -> u8 {
    (BASE_FIELDS.len() + derived_fields(kind).len()) as u8
}

/// FNV-1a fingerprint of the whole schema, version included. Exchanged in
/// the ready handshake; a mismatch refuses the connection.
pub fn schema_fingerprint() -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    let mut mix = |bytes: &[u8]| {
        for byte in bytes {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
    };
    mix(&SCHEMA_VERSION.to_le_bytes());
    for kind in [
        EntityKind::Group,
        EntityKind::Prop,
        EntityKind::Actor,
        EntityKind::Light,
    ] {
        mix(kind.label().as_bytes());
        for field in kind_schema(kind) {
            mix(field.name.as_bytes());
            mix(&[field.ty as u8, field.raw_at.tag()]);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;

    #[test]
    fn base_fields_precede_derived_fields() {
        for kind in [EntityKind::Prop, EntityKind::Actor, EntityKind::Light] {
            let names: Vec<&str> = kind_schema(kind).map(|f| f.name).collect();
            assert_eq!(
                &names[..BASE_FIELDS.len()],
                &[
                    "position", "rotation", "scale", "visible", "animated", "priority"
                ]
            );
        }
        assert_eq!(field_count(EntityKind::Group), 6);
        assert_eq!(field_count(EntityKind::Prop), 7);
        assert_eq!(field_count(EntityKind::Actor), 9);
        assert_eq!(field_count(EntityKind::Light), 8);
    }

    #[test]
    fn getters_and_setters_agree() {
        let mut entity = Entity::spawn(EntityId::new(3), EntityKind::Actor);
        for field in kind_schema(EntityKind::Actor) {
            let value = (field.get)(&entity);
            (field.set)(&mut entity, value.clone());
            assert_eq!((field.get)(&entity), value, "field {}", field.name);
        }
    }

    #[test]
    fn setter_applies_through_descriptor() {
        let mut entity = Entity::spawn(EntityId::new(4), EntityKind::Light);
        let intensity = kind_schema(EntityKind::Light)
            .find(|f| f.name == "intensity")
            .unwrap();
        (intensity.set)(&mut entity, FieldValue::Float(0.25));
        assert_eq!((intensity.get)(&entity), FieldValue::Float(0.25));
    }

    #[test]
    fn fingerprint_is_stable_across_calls() {
        assert_eq!(schema_fingerprint(), schema_fingerprint());
        assert_ne!(schema_fingerprint(), 0);
    }
}
