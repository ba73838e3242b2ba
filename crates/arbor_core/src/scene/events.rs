//! Notifications raised by entities.
//!
//! Observers are plain closures registered per entity. Delivery is synchronous
//! and in order: an event fires after the structural change it describes and
//! before the mutating call returns.

use crate::scene::{ComponentId, Entity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyEvent {
    /// Delivered to the parent once the registry has indexed the child.
    ChildAdded { parent: Entity, child: Entity },
    /// Delivered to the former parent.
    ChildDetached { parent: Entity, child: Entity },
    ChildOrderChanged {
        parent: Entity,
        child: Entity,
        from: usize,
        to: usize,
    },
    ComponentAdded { entity: Entity, component: ComponentId },
    ComponentDetached { entity: Entity, component: ComponentId },
    NameChanged {
        entity: Entity,
        old: String,
        new: String,
    },
    TagChanged {
        entity: Entity,
        old: Option<String>,
        new: Option<String>,
    },
}

/// Handle returned by [`Hierarchy::subscribe`](crate::scene::Hierarchy::subscribe).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) type Observer = Box<dyn FnMut(&HierarchyEvent)>;

/// Extra acceptance check consulted on rename, after the built-in rules.
pub type NameValidator = Box<dyn Fn(Entity, &str) -> bool>;
