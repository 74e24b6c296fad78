use glam::Vec3;

use crate::types::EntityId;

/// Network priority tier of an entity. Every replicated float field names a
/// minimum tier at which it is sent raw instead of quantized; `Local` is
/// reserved for the locally-controlled actor and sits above every such
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetPriority {
    Low,
    Medium,
    High,
    Local,
}

impl NetPriority {
    pub fn tag(self) -> u8 {
        match self {
            NetPriority::Low => 0,
            NetPriority::Medium => 1,
            NetPriority::High => 2,
            NetPriority::Local => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(NetPriority::Low),
            1 => Some(NetPriority::Medium),
            2 => Some(NetPriority::High),
            3 => Some(NetPriority::Local),
            _ => None,
        }
    }

    /// True when this tier sends fields with the given threshold raw.
    pub fn bypasses(self, raw_at: NetPriority) -> bool {
        self >= raw_at
    }
}

/// Closed set of entity kinds. The tag selects the replicated field schema
/// and the client-side factory; there is no runtime type registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Group,
    Prop,
    Actor,
    Light,
}

impl EntityKind {
    pub fn tag(self) -> u8 {
        match self {
            EntityKind::Group => 0,
            EntityKind::Prop => 1,
            EntityKind::Actor => 2,
            EntityKind::Light => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EntityKind::Group),
            1 => Some(EntityKind::Prop),
            2 => Some(EntityKind::Actor),
            3 => Some(EntityKind::Light),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Group => "group",
            EntityKind::Prop => "prop",
            EntityKind::Actor => "actor",
            EntityKind::Light => "light",
        }
    }
}

/// Kind-specific entity state.
#[derive(Clone, Debug, PartialEq)]
pub enum KindState {
    Group,
    Prop { model: u16 },
    Actor { model: u16, heading: f32, frame: f32 },
    Light { color: Vec3, intensity: f32 },
}

impl KindState {
    pub fn kind(&self) -> EntityKind {
        match self {
            KindState::Group => EntityKind::Group,
            KindState::Prop { .. } => EntityKind::Prop,
            KindState::Actor { .. } => EntityKind::Actor,
            KindState::Light { .. } => EntityKind::Light,
        }
    }

    fn default_for(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Group => KindState::Group,
            EntityKind::Prop => KindState::Prop { model: 0 },
            EntityKind::Actor => KindState::Actor {
                model: 0,
                heading: 0.0,
                frame: 0.0,
            },
            EntityKind::Light => KindState::Light {
                color: Vec3::ONE,
                intensity: 1.0,
            },
        }
    }
}

/// One node of the scene tree. Pose fields go through setters so rotation
/// degrees are always stored normalized to [0, 360) per axis, which keeps
/// the quantizer's range assumption valid.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    name: String,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    visible: bool,
    animated: bool,
    priority: NetPriority,
    state: KindState,
}

impl Entity {
    /// Kind-keyed factory. The name is derived from kind and id, so both
    /// endpoints generate the same unique name independently.
    pub(crate) fn spawn(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            name: format!("{}-{}", kind.label(), id.raw()),
            parent: None,
            children: Vec::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            animated: false,
            priority: NetPriority::Low,
            state: KindState::default_for(kind),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.state.kind()
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = Vec3::new(
            normalize_degrees(rotation.x),
            normalize_degrees(rotation.y),
            normalize_degrees(rotation.z),
        );
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn animated(&self) -> bool {
        self.animated
    }

    pub fn set_animated(&mut self, animated: bool) {
        self.animated = animated;
    }

    pub fn priority(&self) -> NetPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: NetPriority) {
        self.priority = priority;
    }

    pub fn state(&self) -> &KindState {
        &self.state
    }

    /// Mutable access to kind state. The kind tag itself is fixed at
    /// creation; callers must not swap the variant.
    pub fn state_mut(&mut self) -> &mut KindState {
        &mut self.state
    }
}

/// Maps any angle in degrees into [0, 360).
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can return 360.0 when the input is a tiny negative value.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
