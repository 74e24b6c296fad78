use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::types::EntityId;
use crate::world::entity::{Entity, EntityKind};
use crate::world::error::WorldError;

/// Id- and name-indexed directory of entities forming a scene tree.
///
/// The registry is an explicit value passed into every operation that needs
/// it; there are no process-wide directories. Ids come from a monotonically
/// increasing counter and are never reused while the process lives. The
/// tree exists server-side for simulation convenience; replication is
/// flat, and replicated entities land under the root group.
pub struct WorldRegistry {
    entities: BTreeMap<EntityId, Entity>,
    names: HashMap<String, EntityId>,
    root: EntityId,
    next_id: u32,
}

impl WorldRegistry {
    pub fn new() -> Self {
        let root = EntityId::new(1);
        let mut registry = Self {
            entities: BTreeMap::new(),
            names: HashMap::new(),
            root,
            next_id: 2,
        };
        let entity = Entity::spawn(root, EntityKind::Group);
        registry.names.insert(entity.name().to_string(), root);
        registry.entities.insert(root, entity);
        registry
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Creates an entity of the given kind under `parent` and returns its
    /// freshly assigned id.
    pub fn create(&mut self, kind: EntityKind, parent: EntityId) -> Result<EntityId, WorldError> {
        if !self.entities.contains_key(&parent) {
            return Err(WorldError::UnknownParent(parent));
        }
        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let mut entity = Entity::spawn(id, kind);
        entity.parent = Some(parent);
        debug!("registered entity `{}`", entity.name());
        self.names.insert(entity.name().to_string(), id);
        self.entities.insert(id, entity);
        if let Some(parent_entity) = self.entities.get_mut(&parent) {
            parent_entity.children.push(id);
        }
        Ok(id)
    }

    /// Inserts an entity whose id was assigned by a remote authority. Used
    /// by the client reconciler; the entity lands under the root group and
    /// the local id counter is advanced past the wire id.
    pub fn insert_replicated(&mut self, id: EntityId, kind: EntityKind) -> Result<(), WorldError> {
        if self.entities.contains_key(&id) {
            return Err(WorldError::DuplicateEntity(id));
        }
        let mut entity = Entity::spawn(id, kind);
        entity.parent = Some(self.root);
        debug!("registered replicated entity `{}`", entity.name());
        self.names.insert(entity.name().to_string(), id);
        self.entities.insert(id, entity);
        let root = self.root;
        if let Some(root_entity) = self.entities.get_mut(&root) {
            root_entity.children.push(id);
        }
        self.next_id = self.next_id.max(id.raw() + 1);
        Ok(())
    }

    /// Removes an entity and its whole subtree from the registry, detaching
    /// it from its parent. Returns the removed entity.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity, WorldError> {
        if id == self.root {
            return Err(WorldError::CannotRemoveRoot);
        }
        if !self.entities.contains_key(&id) {
            return Err(WorldError::UnknownEntity(id));
        }

        // Collect the subtree before mutating anything.
        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            doomed.push(current);
            if let Some(entity) = self.entities.get(&current) {
                stack.extend_from_slice(&entity.children);
            }
        }

        let parent = self.entities.get(&id).and_then(|e| e.parent());
        if let Some(parent) = parent {
            if let Some(parent_entity) = self.entities.get_mut(&parent) {
                parent_entity.children.retain(|child| *child != id);
            }
        }

        let mut removed = None;
        for doomed_id in doomed {
            if let Some(entity) = self.entities.remove(&doomed_id) {
                self.names.remove(entity.name());
                if doomed_id == id {
                    removed = Some(entity);
                }
            }
        }
        removed.ok_or(WorldError::UnknownEntity(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Name-indexed lookup.
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Iteration over the name index.
    pub fn names(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Live entity ids in ascending order, the root group included.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Ids the replication layer may ship: everything except the root
    /// group, which each endpoint owns locally.
    pub fn replicable_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        let root = self.root;
        self.entities.keys().copied().filter(move |id| *id != root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for WorldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_monotonic_ids_and_indexes_names() {
        let mut world = WorldRegistry::new();
        let a = world.create(EntityKind::Prop, world.root()).unwrap();
        let b = world.create(EntityKind::Actor, world.root()).unwrap();
        assert!(b > a);
        assert_eq!(world.lookup("prop-2"), Some(a));
        assert_eq!(world.lookup("actor-3"), Some(b));
        assert_eq!(world.get(a).unwrap().parent(), Some(world.root()));
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut world = WorldRegistry::new();
        let a = world.create(EntityKind::Prop, world.root()).unwrap();
        world.remove(a).unwrap();
        let b = world.create(EntityKind::Prop, world.root()).unwrap();
        assert!(b > a);
        assert!(!world.contains(a));
    }

    #[test]
    fn remove_takes_the_subtree_with_it() {
        let mut world = WorldRegistry::new();
        let group = world.create(EntityKind::Group, world.root()).unwrap();
        let child = world.create(EntityKind::Prop, group).unwrap();
        let grandchild = world.create(EntityKind::Light, child).unwrap();

        world.remove(group).unwrap();
        assert!(!world.contains(group));
        assert!(!world.contains(child));
        assert!(!world.contains(grandchild));
        assert!(world.lookup("prop-3").is_none());
        // Only the root remains.
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut world = WorldRegistry::new();
        assert_eq!(world.remove(world.root()), Err(WorldError::CannotRemoveRoot));
    }

    #[test]
    fn replicated_inserts_bump_the_counter() {
        let mut world = WorldRegistry::new();
        world
            .insert_replicated(EntityId::new(40), EntityKind::Actor)
            .unwrap();
        assert_eq!(
            world.insert_replicated(EntityId::new(40), EntityKind::Actor),
            Err(WorldError::DuplicateEntity(EntityId::new(40)))
        );
        // Local creation continues past the replicated id.
        let next = world.create(EntityKind::Prop, world.root()).unwrap();
        assert!(next.raw() > 40);
    }

    #[test]
    fn replicable_ids_exclude_the_root() {
        let mut world = WorldRegistry::new();
        let a = world.create(EntityKind::Prop, world.root()).unwrap();
        let ids: Vec<EntityId> = world.replicable_ids().collect();
        assert_eq!(ids, vec![a]);
    }
}
