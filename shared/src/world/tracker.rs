//! Attribute change-tracker.
//!
//! The tracker runs in two directions over the same schema walk. Write mode
//! (server) compares an entity against the snapshot a client last received,
//! copies changed values into the snapshot and records each change in a
//! `DiffMask`. Read mode (client) walks the same schema and stores every
//! masked incoming value into the local entity. Both directions advance an
//! explicit `FieldCursor` once per field, whether or not the field changed,
//! so bit *i* always lands on the *i*-th schema field.

use log::warn;

use crate::messages::delta::EntityUpdate;
use crate::world::entity::Entity;
use crate::world::schema::{field_count, kind_schema};

/// Fixed-width per-entity attribute bitmask. Bit *i* corresponds to the
/// *i*-th field of the owning kind's schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffMask {
    bits: u16,
    length: u8,
}

impl DiffMask {
    pub fn new(length: u8) -> Self {
        debug_assert!(length as usize <= u16::BITS as usize);
        Self { bits: 0, length }
    }

    /// A mask with every field flagged, used when a fresh snapshot means
    /// "all fields present".
    pub fn full(length: u8) -> Self {
        let mut mask = Self::new(length);
        mask.bits = if length as u32 >= u16::BITS {
            u16::MAX
        } else {
            (1u16 << length) - 1
        };
        mask
    }

    pub fn set_bit(&mut self, index: u8, value: bool) {
        if index >= self.length {
            return;
        }
        if value {
            self.bits |= 1 << index;
        } else {
            self.bits &= !(1 << index);
        }
    }

    pub fn bit(&self, index: u8) -> bool {
        index < self.length && self.bits & (1 << index) != 0
    }

    pub fn is_clear(&self) -> bool {
        self.bits == 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn or(&mut self, other: &DiffMask) {
        self.bits |= other.bits;
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    pub fn to_bits(&self) -> u16 {
        self.bits
    }

    pub fn from_bits(bits: u16, length: u8) -> Option<Self> {
        let mut mask = Self::new(length);
        let valid = if length as u32 >= u16::BITS {
            u16::MAX
        } else {
            (1u16 << length) - 1
        };
        if bits & !valid != 0 {
            return None;
        }
        mask.bits = bits;
        Some(mask)
    }
}

/// Explicit walk cursor, threaded by value through every field visit.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldCursor(u8);

impl FieldCursor {
    pub fn new() -> Self {
        Self(0)
    }

    /// Returns the current bit index and moves to the next field.
    pub fn advance(&mut self) -> u8 {
        let index = self.0;
        self.0 += 1;
        index
    }

    pub fn position(&self) -> u8 {
        self.0
    }
}

/// Write mode: records into `mask` every field where `authoritative`
/// differs from `snapshot`, copying the new value into the snapshot.
/// Returns whether any bit was set, i.e. whether this entity is worth
/// including in an update.
pub fn record_changes(snapshot: &mut Entity, authoritative: &Entity, mask: &mut DiffMask) -> bool {
    debug_assert_eq!(snapshot.kind(), authoritative.kind());
    let mut cursor = FieldCursor::new();
    let mut changed = false;
    for field in kind_schema(authoritative.kind()) {
        let bit = cursor.advance();
        let theirs = (field.get)(authoritative);
        let mine = (field.get)(snapshot);
        if mine != theirs {
            (field.set)(snapshot, theirs);
            mask.set_bit(bit, true);
            changed = true;
        } else {
            mask.set_bit(bit, false);
        }
    }
    changed
}

/// Read mode: stores each masked incoming value into `entity`. Unmasked
/// fields are left alone; the cursor still advances past them.
pub fn apply_update(entity: &mut Entity, update: &EntityUpdate) {
    if entity.kind() != update.kind {
        warn!(
            "update kind {:?} does not match entity {} ({:?}); dropping",
            update.kind,
            entity.id(),
            entity.kind()
        );
        return;
    }
    let mut cursor = FieldCursor::new();
    let mut incoming = update.values.iter();
    for field in kind_schema(update.kind) {
        let bit = cursor.advance();
        if !update.mask.bit(bit) {
            continue;
        }
        match incoming.next() {
            Some(value) => (field.set)(entity, value.clone()),
            None => {
                warn!(
                    "update for {} ran out of values at field `{}`",
                    entity.id(),
                    field.name
                );
                return;
            }
        }
    }
}

/// Convenience: a full-length mask for the given entity's kind.
pub fn full_mask(entity: &Entity) -> DiffMask {
    DiffMask::full(field_count(entity.kind()))
}
