//! The per-client game-state delta: the only message whose size scales with
//! world churn, and the one every other piece of this crate exists to feed.

use std::collections::BTreeMap;

use driftnet_archive::{ArchiveError, ArchiveRead, ArchiveWrite, Marshal};

use crate::quantize::Quantizer;
use crate::types::{ConnectionId, EntityId};
use crate::world::entity::{Entity, EntityKind, NetPriority};
use crate::world::schema::{field_count, kind_schema, FieldType, FieldValue};
use crate::world::tracker::{DiffMask, FieldCursor};

/// Roster line for one connected client.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientEntry {
    pub connection: ConnectionId,
    pub name: String,
}

/// Why an id appears in the `deleted` set. The differ knows whether the
/// entity is gone from the authoritative registry or merely left this
/// client's visibility filter, and says so instead of conflating the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalReason {
    Destroyed,
    OutOfScope,
}

impl RemovalReason {
    fn tag(self) -> u8 {
        match self {
            RemovalReason::Destroyed => 0,
            RemovalReason::OutOfScope => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RemovalReason::Destroyed),
            1 => Some(RemovalReason::OutOfScope),
            _ => None,
        }
    }
}

/// Changed-field payload for one entity. Carries only the fields flagged in
/// the mask, in schema order. The header repeats the entity's current
/// priority tier so the decoder's quantization choices never depend on
/// stale client state.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityUpdate {
    pub kind: EntityKind,
    pub priority: NetPriority,
    pub mask: DiffMask,
    pub values: Vec<FieldValue>,
}

impl EntityUpdate {
    /// Collects the masked fields out of `entity`.
    pub fn capture(entity: &Entity, mask: DiffMask) -> Self {
        let mut values = Vec::new();
        let mut cursor = FieldCursor::new();
        for field in kind_schema(entity.kind()) {
            let bit = cursor.advance();
            if mask.bit(bit) {
                values.push((field.get)(entity));
            }
        }
        Self {
            kind: entity.kind(),
            priority: entity.priority(),
            mask,
            values,
        }
    }

    /// A full-mask capture: every field present. Used when an id is new to
    /// a client.
    pub fn full(entity: &Entity) -> Self {
        Self::capture(entity, DiffMask::full(field_count(entity.kind())))
    }
}

impl Marshal for EntityUpdate {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        ar.write_u8(self.kind.tag());
        ar.write_u8(self.priority.tag());
        ar.write_u16(self.mask.to_bits());

        let quantizer = Quantizer::default();
        let mut cursor = FieldCursor::new();
        let mut values = self.values.iter();
        for field in kind_schema(self.kind) {
            let bit = cursor.advance();
            if !self.mask.bit(bit) {
                continue;
            }
            let Some(value) = values.next() else {
                debug_assert!(false, "mask flags more fields than captured values");
                break;
            };
            let bypass = self.priority.bypasses(field.raw_at);
            match value {
                FieldValue::Vec3(v) => quantizer.write_vec3(ar, *v, bypass),
                FieldValue::Float(v) => quantizer.write_scalar(ar, *v, bypass),
                FieldValue::Bool(v) => ar.write_bool(*v),
                FieldValue::Uint(v) => ar.write_u16(*v),
            }
        }
    }

    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        let kind_tag = ar.read_u8()?;
        let kind = EntityKind::from_tag(kind_tag).ok_or(ArchiveError::UnknownTag {
            what: "entity kind",
            tag: kind_tag,
        })?;
        let priority_tag = ar.read_u8()?;
        let priority = NetPriority::from_tag(priority_tag).ok_or(ArchiveError::UnknownTag {
            what: "net priority",
            tag: priority_tag,
        })?;
        let bits = ar.read_u16()?;
        let mask = DiffMask::from_bits(bits, field_count(kind)).ok_or(ArchiveError::Malformed {
            what: "attribute mask",
        })?;

        let quantizer = Quantizer::default();
        let mut values = Vec::new();
        let mut cursor = FieldCursor::new();
        for field in kind_schema(kind) {
            let bit = cursor.advance();
            if !mask.bit(bit) {
                continue;
            }
            let bypass = priority.bypasses(field.raw_at);
            let value = match field.ty {
                FieldType::Vec3 => FieldValue::Vec3(quantizer.read_vec3(ar, bypass)?),
                FieldType::Float => FieldValue::Float(quantizer.read_scalar(ar, bypass)?),
                FieldType::Bool => FieldValue::Bool(ar.read_bool()?),
                FieldType::Uint => FieldValue::Uint(ar.read_u16()?),
            };
            values.push(value);
        }

        Ok(Self {
            kind,
            priority,
            mask,
            values,
        })
    }
}

/// One broadcast tick's worth of change for a single client.
///
/// `updated` and `deleted` are disjoint id sets; the roster rides along
/// only when session membership changed since the last broadcast.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DeltaMessage {
    pub table_changed: bool,
    pub client_table: Option<Vec<ClientEntry>>,
    pub updated: BTreeMap<EntityId, EntityUpdate>,
    pub deleted: BTreeMap<EntityId, RemovalReason>,
}

impl DeltaMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.table_changed && self.updated.is_empty() && self.deleted.is_empty()
    }
}

impl Marshal for DeltaMessage {
    fn marshal(&self, ar: &mut dyn ArchiveWrite) {
        debug_assert!(
            self.updated.keys().all(|id| !self.deleted.contains_key(id)),
            "updated and deleted must be disjoint"
        );

        ar.write_bool(self.table_changed);
        if self.table_changed {
            let empty = Vec::new();
            let table = self.client_table.as_ref().unwrap_or(&empty);
            ar.write_u16(table.len() as u16);
            for entry in table {
                entry.connection.marshal(ar);
                ar.write_str(&entry.name);
            }
        }

        ar.write_u16(self.updated.len() as u16);
        for (id, update) in &self.updated {
            id.marshal(ar);
            update.marshal(ar);
        }

        ar.write_u16(self.deleted.len() as u16);
        for (id, reason) in &self.deleted {
            id.marshal(ar);
            ar.write_u8(reason.tag());
        }
    }

    fn unmarshal(ar: &mut dyn ArchiveRead) -> Result<Self, ArchiveError> {
        let table_changed = ar.read_bool()?;
        let client_table = if table_changed {
            let count = ar.read_u16()?;
            let mut table = Vec::with_capacity(count as usize);
            for _ in 0..count {
                table.push(ClientEntry {
                    connection: ConnectionId::unmarshal(ar)?,
                    name: ar.read_string()?,
                });
            }
            Some(table)
        } else {
            None
        };

        let updated_count = ar.read_u16()?;
        let mut updated = BTreeMap::new();
        for _ in 0..updated_count {
            let id = EntityId::unmarshal(ar)?;
            let update = EntityUpdate::unmarshal(ar)?;
            updated.insert(id, update);
        }

        let deleted_count = ar.read_u16()?;
        let mut deleted = BTreeMap::new();
        for _ in 0..deleted_count {
            let id = EntityId::unmarshal(ar)?;
            let tag = ar.read_u8()?;
            let reason = RemovalReason::from_tag(tag).ok_or(ArchiveError::UnknownTag {
                what: "removal reason",
                tag,
            })?;
            if updated.contains_key(&id) {
                return Err(ArchiveError::Malformed {
                    what: "delta with overlapping updated/deleted sets",
                });
            }
            deleted.insert(id, reason);
        }

        Ok(Self {
            table_changed,
            client_table,
            updated,
            deleted,
        })
    }
}
