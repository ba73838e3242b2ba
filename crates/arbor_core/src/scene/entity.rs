//! Entity handles and identity
//!
//! Entities are lightweight handles (8 bytes) into the hierarchy arena.
//! The generation counter detects handles to destroyed nodes.
//!
//! Identity is separate from the handle: [`EntityId`] and [`ComponentId`]
//! are stable values that may be reassigned (e.g. to merge with ids coming
//! from a serialized scene) without invalidating handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Slot in the hierarchy arena
/// - Generation: Incremented when the node is destroyed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a 64-bit integer (for tooling and logs)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Unpack from a 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Stable identity of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a component.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u64);

impl ComponentId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c#{}", self.0)
    }
}

/// Issues fresh ids. Owned by the hierarchy; never global.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next_entity: u64,
    next_component: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            next_component: 1,
        }
    }

    pub fn next_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    pub fn next_component(&mut self) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        id
    }

    /// Keep future ids clear of an externally assigned one.
    pub fn observe_entity(&mut self, id: EntityId) {
        self.next_entity = self.next_entity.max(id.0.saturating_add(1));
    }

    pub fn observe_component(&mut self, id: ComponentId) {
        self.next_component = self.next_component.max(id.0.saturating_add(1));
    }
}

/// Issues default node names ("Entity 1", "Entity 2", ...).
#[derive(Debug)]
pub(crate) struct NameCounter {
    prefix: String,
    next: u64,
}

impl NameCounter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    pub fn next_name(&mut self) -> String {
        let name = format!("{} {}", self.prefix, self.next);
        self.next += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip_preserves_generation() {
        let entity = Entity::new(7, 3);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
    }

    #[test]
    fn observed_ids_are_never_reissued() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_entity(), EntityId::from_raw(1));
        ids.observe_entity(EntityId::from_raw(40));
        assert_eq!(ids.next_entity(), EntityId::from_raw(41));

        ids.observe_component(ComponentId::from_raw(5));
        assert_eq!(ids.next_component(), ComponentId::from_raw(6));
    }

    #[test]
    fn default_names_are_numbered() {
        let mut names = NameCounter::new("Node");
        assert_eq!(names.next_name(), "Node 1");
        assert_eq!(names.next_name(), "Node 2");
    }
}
