// node.rs - Per-entity record stored in the hierarchy arena

use crate::lifecycle::Lifecycle;
use crate::scene::component::ComponentSlot;
use crate::scene::events::{HierarchyEvent, NameValidator, Observer};
use crate::scene::{ComponentId, Entity, EntityId, RegistryId, SubscriptionId, TemplateRef};
use std::collections::HashMap;

pub(crate) struct NodeRecord {
    pub id: EntityId,
    pub name: String,
    pub tag: Option<String>,
    pub enabled: bool,
    /// Own flag AND parent's derived flag; a root's implicit parent is enabled.
    pub hierarchy_enabled: bool,
    pub lifecycle: Lifecycle,
    pub parent: Option<Entity>,
    pub children: Vec<Entity>, // Insertion order drives propagation order
    pub child_ids: HashMap<EntityId, Entity>, // Kept in sync with `children`
    pub units: Vec<ComponentSlot>,
    pub registry: Option<RegistryId>,
    pub template: Option<TemplateRef>,
    pub observers: Vec<(SubscriptionId, Observer)>,
    pub name_validator: Option<NameValidator>,
}

impl NodeRecord {
    pub fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            tag: None,
            enabled: true,
            hierarchy_enabled: true,
            lifecycle: Lifecycle::new(),
            parent: None,
            children: Vec::new(),
            child_ids: HashMap::new(),
            units: Vec::new(),
            registry: None,
            template: None,
            observers: Vec::new(),
            name_validator: None,
        }
    }

    pub fn unit_index(&self, id: ComponentId) -> Option<usize> {
        self.units.iter().position(|slot| slot.id == id)
    }

    pub fn notify(&mut self, event: &HierarchyEvent) {
        for (_, observer) in self.observers.iter_mut() {
            observer(event);
        }
    }
}

/// Arena slot. `record` is `None` once the node is destroyed.
pub(crate) struct Slot {
    pub generation: u32,
    pub record: Option<NodeRecord>,
}
