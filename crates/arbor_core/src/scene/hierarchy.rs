// hierarchy.rs - Entity arena, structure mutation and identity
//
// Lifecycle sweeps live in propagate.rs, component operations in units.rs and
// lookups in query.rs/path.rs; all of them are `impl Hierarchy` blocks over
// the state defined here.

use crate::error::{HierarchyError, Result};
use crate::lifecycle::LifecycleState;
use crate::scene::capture::{Capture, CaptureHook};
use crate::scene::entity::{IdAllocator, NameCounter};
use crate::scene::events::{HierarchyEvent, NameValidator};
use crate::scene::node::{NodeRecord, Slot};
use crate::scene::path;
use crate::scene::{ComponentId, Entity, EntityId, RegistryId, SceneRegistry, SubscriptionId};
use crate::settings::HierarchySettings;
use arbor_metrics::{Counter, SweepProfiler};
use std::collections::HashMap;

/// Reference to a direct child by handle, id or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRef<'a> {
    Entity(Entity),
    Id(EntityId),
    Name(&'a str),
}

impl From<Entity> for ChildRef<'_> {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl From<EntityId> for ChildRef<'_> {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for ChildRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

/// Owns every entity of one or more scene trees.
///
/// Nodes are created detached and unregistered. They join a registry when
/// registered as a root or inserted under a registered ancestor, and leave it
/// symmetrically on removal.
pub struct Hierarchy {
    pub(crate) slots: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) ids: HashMap<EntityId, Entity>,
    pub(crate) component_owners: HashMap<ComponentId, Entity>,
    pub(crate) registries: Vec<Box<dyn SceneRegistry>>,
    pub(crate) allocator: IdAllocator,
    names: NameCounter,
    pub(crate) settings: HierarchySettings,
    pub(crate) capture: Capture,
    next_subscription: u64,
    pub(crate) counters: Counter,
    pub(crate) profiler: SweepProfiler,
}

pub(crate) fn record(slots: &[Slot], entity: Entity) -> Result<&NodeRecord> {
    slots
        .get(entity.index() as usize)
        .filter(|slot| slot.generation == entity.generation())
        .and_then(|slot| slot.record.as_ref())
        .ok_or(HierarchyError::Destroyed(entity))
}

pub(crate) fn record_mut(slots: &mut [Slot], entity: Entity) -> Result<&mut NodeRecord> {
    slots
        .get_mut(entity.index() as usize)
        .filter(|slot| slot.generation == entity.generation())
        .and_then(|slot| slot.record.as_mut())
        .ok_or(HierarchyError::Destroyed(entity))
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::with_settings(HierarchySettings::default())
    }

    pub fn with_settings(settings: HierarchySettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            ids: HashMap::new(),
            component_owners: HashMap::new(),
            registries: Vec::new(),
            allocator: IdAllocator::new(),
            names: NameCounter::new(settings.default_name_prefix.clone()),
            capture: Capture::new(settings.default_capture),
            settings,
            next_subscription: 1,
            counters: Counter::new(),
            profiler: SweepProfiler::new(),
        }
    }

    pub fn settings(&self) -> &HierarchySettings {
        &self.settings
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn profiler(&self) -> &SweepProfiler {
        &self.profiler
    }

    // ── Arena ─────────────────────────────────────────────────────────

    pub(crate) fn node(&self, entity: Entity) -> Result<&NodeRecord> {
        record(&self.slots, entity)
    }

    pub(crate) fn node_mut(&mut self, entity: Entity) -> Result<&mut NodeRecord> {
        record_mut(&mut self.slots, entity)
    }

    fn alloc(&mut self, record: NodeRecord) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return Entity::new(index, slot.generation);
        }
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        Entity::new((self.slots.len() - 1) as u32, 0)
    }

    /// Release a destroyed node's slot. Stale handles fail from here on.
    pub(crate) fn release(&mut self, entity: Entity) {
        let Some(slot) = self.slots.get_mut(entity.index() as usize) else {
            return;
        };
        if slot.generation != entity.generation() {
            return;
        }
        if let Some(record) = slot.record.take() {
            self.ids.remove(&record.id);
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index());
    }

    /// True while the handle refers to a live (not destroyed) node.
    pub fn contains(&self, entity: Entity) -> bool {
        self.node(entity).is_ok()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    // ── Creation ──────────────────────────────────────────────────────

    /// Create a detached, unregistered node. `None` picks the next default name.
    pub fn create(&mut self, name: Option<&str>) -> Result<Entity> {
        let name = match name {
            Some(name) => {
                path::validate_name(name)?;
                name.to_string()
            }
            None => self.names.next_name(),
        };
        let id = self.allocator.next_entity();
        Ok(self.spawn(id, name))
    }

    /// Create a node with an externally sourced id.
    pub fn create_with_id(&mut self, id: EntityId, name: Option<&str>) -> Result<Entity> {
        if self.ids.contains_key(&id) {
            return Err(HierarchyError::DuplicateEntityId { id });
        }
        let name = match name {
            Some(name) => {
                path::validate_name(name)?;
                name.to_string()
            }
            None => self.names.next_name(),
        };
        self.allocator.observe_entity(id);
        Ok(self.spawn(id, name))
    }

    fn spawn(&mut self, id: EntityId, name: String) -> Entity {
        let entity = self.alloc(NodeRecord::new(id, name));
        self.ids.insert(id, entity);
        tracing::trace!(entity = %entity, id = %id, "entity created");
        entity
    }

    // ── Identity ──────────────────────────────────────────────────────

    pub fn id(&self, entity: Entity) -> Result<EntityId> {
        Ok(self.node(entity)?.id)
    }

    /// Live node carrying `id`, if any.
    pub fn entity_by_id(&self, id: EntityId) -> Option<Entity> {
        self.ids.get(&id).copied()
    }

    /// Reassign a node id. Every index keyed by the old id is rebuilt; the
    /// node keeps its position among its siblings.
    pub fn set_entity_id(&mut self, entity: Entity, id: EntityId) -> Result<()> {
        let old = self.node(entity)?.id;
        if old == id {
            return Ok(());
        }
        if self.ids.contains_key(&id) {
            return Err(HierarchyError::DuplicateEntityId { id });
        }

        let (parent, registry, tag) = {
            let node = self.node_mut(entity)?;
            node.id = id;
            (node.parent, node.registry, node.tag.clone())
        };
        self.ids.remove(&old);
        self.ids.insert(id, entity);
        self.allocator.observe_entity(id);

        if let Some(parent) = parent {
            let parent = self.node_mut(parent)?;
            parent.child_ids.remove(&old);
            parent.child_ids.insert(id, entity);
        }
        if let Some(registry) = registry {
            let registry = &mut self.registries[registry.index()];
            registry.unregister(entity, old, tag.as_deref());
            registry.register(entity, id, tag.as_deref());
        }
        tracing::debug!(entity = %entity, old = %old, new = %id, "entity id reassigned");
        Ok(())
    }

    pub fn name(&self, entity: Entity) -> Result<&str> {
        Ok(self.node(entity)?.name.as_str())
    }

    /// Rename a node.
    ///
    /// Rejected (leaving the old name) when empty, when it contains the path
    /// separator or a reserved token, when a sibling already uses it, or when
    /// the node's name validator refuses it.
    pub fn set_name(&mut self, entity: Entity, name: &str) -> Result<()> {
        path::validate_name(name)?;
        let node = self.node(entity)?;
        if node.name == name {
            return Ok(());
        }
        if let Some(parent) = node.parent {
            if self.child_by_name(parent, name)?.is_some() {
                return Err(HierarchyError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }
        if let Some(validator) = &node.name_validator {
            if !validator(entity, name) {
                return Err(HierarchyError::NameRejected {
                    name: name.to_string(),
                });
            }
        }

        let node = self.node_mut(entity)?;
        let old = std::mem::replace(&mut node.name, name.to_string());
        node.notify(&HierarchyEvent::NameChanged {
            entity,
            old,
            new: name.to_string(),
        });
        Ok(())
    }

    /// Install (or clear) the extra rename check for `entity`.
    pub fn set_name_validator(
        &mut self,
        entity: Entity,
        validator: Option<NameValidator>,
    ) -> Result<()> {
        self.node_mut(entity)?.name_validator = validator;
        Ok(())
    }

    pub fn tag(&self, entity: Entity) -> Result<Option<&str>> {
        Ok(self.node(entity)?.tag.as_deref())
    }

    /// Replace the tag. Not validated; the registry keeps any tag index.
    pub fn set_tag(&mut self, entity: Entity, tag: Option<&str>) -> Result<()> {
        let (old, registry) = {
            let node = self.node_mut(entity)?;
            let old = std::mem::replace(&mut node.tag, tag.map(str::to_string));
            (old, node.registry)
        };
        if let Some(registry) = registry {
            self.registries[registry.index()].tag_changed(entity, old.as_deref(), tag);
        }
        self.node_mut(entity)?.notify(&HierarchyEvent::TagChanged {
            entity,
            old,
            new: tag.map(str::to_string),
        });
        Ok(())
    }

    /// Read-only state query. Destroyed handles report `Destroyed`.
    pub fn state(&self, entity: Entity) -> LifecycleState {
        self.node(entity)
            .map(|node| node.lifecycle.state())
            .unwrap_or(LifecycleState::Destroyed)
    }

    // ── Observers and hooks ───────────────────────────────────────────

    pub fn subscribe<F>(&mut self, entity: Entity, observer: F) -> Result<SubscriptionId>
    where
        F: FnMut(&HierarchyEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.node_mut(entity)?.observers.push((id, Box::new(observer)));
        Ok(id)
    }

    pub fn unsubscribe(&mut self, entity: Entity, subscription: SubscriptionId) -> Result<bool> {
        let observers = &mut self.node_mut(entity)?.observers;
        let before = observers.len();
        observers.retain(|(id, _)| *id != subscription);
        Ok(observers.len() != before)
    }

    /// Install the capture hook deciding what happens to component failures.
    /// `None` falls back to `settings.default_capture`.
    pub fn set_capture_hook(&mut self, hook: Option<CaptureHook>) {
        self.capture.set_hook(hook);
    }

    pub(crate) fn emit(&mut self, target: Entity, event: HierarchyEvent) {
        if let Ok(node) = self.node_mut(target) {
            node.notify(&event);
        }
    }

    // ── Registries ────────────────────────────────────────────────────

    pub fn add_registry<R: SceneRegistry>(&mut self, registry: R) -> RegistryId {
        self.registries.push(Box::new(registry));
        RegistryId::new((self.registries.len() - 1) as u32)
    }

    pub fn registry<R: SceneRegistry>(&self, id: RegistryId) -> Option<&R> {
        let registry: &dyn SceneRegistry = &**self.registries.get(id.index())?;
        registry.as_any().downcast_ref::<R>()
    }

    pub fn registry_mut<R: SceneRegistry>(&mut self, id: RegistryId) -> Option<&mut R> {
        let registry: &mut dyn SceneRegistry = &mut **self.registries.get_mut(id.index())?;
        registry.as_any_mut().downcast_mut::<R>()
    }

    pub fn registry_of(&self, entity: Entity) -> Result<Option<RegistryId>> {
        Ok(self.node(entity)?.registry)
    }

    /// Hand a parentless node (and its subtree) to a registry as a root.
    pub fn register_root(&mut self, registry: RegistryId, entity: Entity) -> Result<()> {
        if registry.index() >= self.registries.len() {
            return Err(HierarchyError::UnknownRegistry(registry));
        }
        let node = self.node(entity)?;
        if node.parent.is_some() || node.registry.is_some() {
            return Err(HierarchyError::AlreadyParented { child: entity });
        }
        if node.lifecycle.state() == LifecycleState::Unloaded {
            self.load(entity)?;
        }
        self.register_subtree(entity, registry);
        self.registries[registry.index()].entity_added(entity, None);
        Ok(())
    }

    /// Detach a registered root from its registry. Returns `false` when the
    /// node is not a registered root.
    pub fn unregister_root(&mut self, entity: Entity) -> Result<bool> {
        let node = self.node(entity)?;
        let (None, Some(registry)) = (node.parent, node.registry) else {
            return Ok(false);
        };
        self.force_subtree(entity, LifecycleState::Detached)?;
        self.unregister_subtree(entity, registry);
        self.registries[registry.index()].entity_detached(entity, None);
        Ok(true)
    }

    fn register_subtree(&mut self, root: Entity, registry: RegistryId) {
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            let Ok(node) = record_mut(&mut self.slots, entity) else {
                continue;
            };
            node.registry = Some(registry);
            self.registries[registry.index()].register(entity, node.id, node.tag.as_deref());
            stack.extend(node.children.iter().rev());
        }
    }

    fn unregister_subtree(&mut self, root: Entity, registry: RegistryId) {
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            let Ok(node) = record_mut(&mut self.slots, entity) else {
                continue;
            };
            node.registry = None;
            self.registries[registry.index()].unregister(entity, node.id, node.tag.as_deref());
            stack.extend(node.children.iter().rev());
        }
    }

    // ── Structure ─────────────────────────────────────────────────────

    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>> {
        Ok(self.node(entity)?.parent)
    }

    pub fn children(&self, entity: Entity) -> Result<&[Entity]> {
        Ok(self.node(entity)?.children.as_slice())
    }

    /// Append `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<()> {
        let index = self.node(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` among `parent`'s children.
    ///
    /// The child is loaded, indexed, handed the parent's registry and brought
    /// up to the parent's lifecycle state. Fails without structural change
    /// when the child is the parent itself (or an ancestor, with strict cycle
    /// checks), already has a parent or registry, or clashes with a sibling
    /// id or name.
    pub fn insert_child(&mut self, parent: Entity, index: usize, child: Entity) -> Result<()> {
        if parent == child {
            return Err(HierarchyError::SelfParent { entity: parent });
        }
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent.is_some() || child_node.registry.is_some() {
            return Err(HierarchyError::AlreadyParented { child });
        }
        if self.settings.strict_cycle_check && self.is_ancestor(child, parent)? {
            return Err(HierarchyError::CycleDetected { parent, child });
        }
        if parent_node.child_ids.contains_key(&child_node.id) {
            return Err(HierarchyError::DuplicateEntityId { id: child_node.id });
        }
        if self.child_by_name(parent, &child_node.name)?.is_some() {
            return Err(HierarchyError::DuplicateName {
                name: child_node.name.clone(),
            });
        }
        let len = parent_node.children.len();
        if index > len {
            return Err(HierarchyError::IndexOutOfRange { index, len });
        }

        let parent_state = parent_node.lifecycle.state();
        let registry = parent_node.registry;
        let child_id = child_node.id;
        let child_state = child_node.lifecycle.state();

        self.node_mut(child)?.parent = Some(parent);
        if child_state == LifecycleState::Unloaded {
            self.load(child)?;
        }
        {
            let parent_node = self.node_mut(parent)?;
            parent_node.children.insert(index, child);
            parent_node.child_ids.insert(child_id, child);
        }
        if let Some(registry) = registry {
            self.register_subtree(child, registry);
        }
        self.refresh_hierarchy_enabled(child)?;
        self.counters.increment("structure.child_added", 1);

        let caught_up = self.catch_up(child, parent_state);

        if let Some(registry) = registry {
            self.registries[registry.index()].entity_added(child, Some(parent));
        }
        self.emit(parent, HierarchyEvent::ChildAdded { parent, child });
        caught_up
    }

    /// Unlink a child from its parent and registry without destroying it.
    ///
    /// The child subtree is forced to `Detached`. Returns `None` when
    /// `parent` has no such child.
    pub fn detach_child<'a>(
        &mut self,
        parent: Entity,
        child: impl Into<ChildRef<'a>>,
    ) -> Result<Option<Entity>> {
        let Some(child) = self.resolve_child(parent, child.into())? else {
            return Ok(None);
        };
        self.force_subtree(child, LifecycleState::Detached)?;

        let child_id = self.node(child)?.id;
        {
            let parent_node = self.node_mut(parent)?;
            parent_node.children.retain(|c| *c != child);
            parent_node.child_ids.remove(&child_id);
        }
        let registry = {
            let child_node = self.node_mut(child)?;
            child_node.parent = None;
            child_node.registry
        };
        if let Some(registry) = registry {
            self.unregister_subtree(child, registry);
            self.registries[registry.index()].entity_detached(child, Some(parent));
        }
        self.refresh_hierarchy_enabled(child)?;
        self.counters.increment("structure.child_detached", 1);
        self.emit(parent, HierarchyEvent::ChildDetached { parent, child });
        Ok(Some(child))
    }

    /// Detach then destroy a child. Returns `false` when it was not found.
    pub fn remove_child<'a>(
        &mut self,
        parent: Entity,
        child: impl Into<ChildRef<'a>>,
    ) -> Result<bool> {
        match self.detach_child(parent, child)? {
            Some(child) => {
                self.destroy(child)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move a child to `index` among its siblings.
    pub fn set_sibling_index(&mut self, child: Entity, index: usize) -> Result<()> {
        let parent = self
            .node(child)?
            .parent
            .ok_or(HierarchyError::NoOwner { entity: child })?;
        let parent_node = self.node_mut(parent)?;
        let len = parent_node.children.len();
        if index >= len {
            return Err(HierarchyError::IndexOutOfRange { index, len });
        }
        let from = parent_node
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(HierarchyError::NotAChild { parent, child })?;
        if from == index {
            return Ok(());
        }
        let moved = parent_node.children.remove(from);
        parent_node.children.insert(index, moved);
        parent_node.notify(&HierarchyEvent::ChildOrderChanged {
            parent,
            child,
            from,
            to: index,
        });
        Ok(())
    }

    pub fn sibling_index(&self, child: Entity) -> Result<Option<usize>> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(None);
        };
        Ok(self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == child))
    }

    /// True if `ancestor` is `entity` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> Result<bool> {
        let mut cursor = Some(entity);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = self.node(current)?.parent;
        }
        Ok(false)
    }

    pub(crate) fn resolve_child(&self, parent: Entity, child: ChildRef<'_>) -> Result<Option<Entity>> {
        let parent_node = self.node(parent)?;
        Ok(match child {
            ChildRef::Entity(entity) => parent_node.children.contains(&entity).then_some(entity),
            ChildRef::Id(id) => parent_node.child_ids.get(&id).copied(),
            ChildRef::Name(name) => self.child_by_name(parent, name)?,
        })
    }

    // ── Enablement ────────────────────────────────────────────────────

    pub fn is_enabled(&self, entity: Entity) -> Result<bool> {
        Ok(self.node(entity)?.enabled)
    }

    /// Own flag AND every ancestor's flag.
    pub fn is_hierarchy_enabled(&self, entity: Entity) -> Result<bool> {
        Ok(self.node(entity)?.hierarchy_enabled)
    }

    /// Change a node's own enabled flag.
    ///
    /// When the derived flag flips off, the subtree is deactivated. When it
    /// flips on, the subtree is activated if its parent is active (and
    /// started if the parent is started); a registered root is activated and
    /// left for its registry to start.
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> Result<()> {
        self.node_mut(entity)?.enabled = enabled;
        let (before, after) = self.refresh_hierarchy_enabled(entity)?;
        if before == after {
            return Ok(());
        }
        if !after {
            return self.deactivate(entity);
        }

        let node = self.node(entity)?;
        if !node.lifecycle.state().is_attached() {
            return Ok(());
        }
        let (parent, registered) = (node.parent, node.registry.is_some());
        match parent {
            Some(parent) => {
                let parent_state = self.state(parent);
                if parent_state.is_active() {
                    self.activate(entity)?;
                    if parent_state == LifecycleState::Started {
                        self.start(entity)?;
                    }
                }
                Ok(())
            }
            None if registered => self.activate(entity),
            None => Ok(()),
        }
    }

    /// Recompute derived enablement for a subtree from its parent.
    /// Returns the root's flag before and after.
    pub(crate) fn refresh_hierarchy_enabled(&mut self, root: Entity) -> Result<(bool, bool)> {
        let node = self.node(root)?;
        let before = node.hierarchy_enabled;
        let parent_enabled = match node.parent {
            Some(parent) => self.node(parent)?.hierarchy_enabled,
            None => true,
        };

        let mut stack = vec![(root, parent_enabled)];
        while let Some((entity, parent_enabled)) = stack.pop() {
            let node = self.node_mut(entity)?;
            node.hierarchy_enabled = node.enabled && parent_enabled;
            let flag = node.hierarchy_enabled;
            stack.extend(node.children.iter().map(|child| (*child, flag)));
        }
        Ok((before, self.node(root)?.hierarchy_enabled))
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneIndex;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tree() -> (Hierarchy, Entity) {
        let mut hierarchy = Hierarchy::new();
        let root = hierarchy.create(Some("Root")).unwrap();
        (hierarchy, root)
    }

    #[test]
    fn add_child_links_parent_and_indexes() {
        let (mut hierarchy, root) = tree();
        let registry = hierarchy.add_registry(SceneIndex::new());
        hierarchy.register_root(registry, root).unwrap();

        let child = hierarchy.create(Some("A")).unwrap();
        hierarchy.add_child(root, child).unwrap();

        let child_id = hierarchy.id(child).unwrap();
        assert_eq!(hierarchy.parent(child).unwrap(), Some(root));
        assert_eq!(hierarchy.children(root).unwrap(), &[child]);
        assert_eq!(hierarchy.child_by_id(root, child_id).unwrap(), Some(child));
        assert_eq!(
            hierarchy.registry_of(child).unwrap(),
            hierarchy.registry_of(root).unwrap()
        );
        assert_eq!(hierarchy.state(child), LifecycleState::Loaded);
    }

    #[test]
    fn add_child_to_itself_fails_without_change() {
        let (mut hierarchy, root) = tree();
        let err = hierarchy.add_child(root, root).unwrap_err();
        assert!(matches!(err, HierarchyError::SelfParent { .. }));
        assert!(err.is_usage_error());
        assert!(hierarchy.children(root).unwrap().is_empty());
        assert_eq!(hierarchy.parent(root).unwrap(), None);
    }

    #[test]
    fn add_child_to_destroyed_parent_fails() {
        let (mut hierarchy, root) = tree();
        let child = hierarchy.create(Some("A")).unwrap();
        hierarchy.destroy(root).unwrap();

        let err = hierarchy.add_child(root, child).unwrap_err();
        assert!(matches!(err, HierarchyError::Destroyed(e) if e == root));
        assert_eq!(hierarchy.parent(child).unwrap(), None);
    }

    #[test]
    fn already_parented_child_is_rejected() {
        let (mut hierarchy, root) = tree();
        let other = hierarchy.create(Some("Other")).unwrap();
        let child = hierarchy.create(Some("A")).unwrap();
        hierarchy.add_child(root, child).unwrap();

        let err = hierarchy.add_child(other, child).unwrap_err();
        assert!(matches!(err, HierarchyError::AlreadyParented { .. }));
        assert_eq!(hierarchy.parent(child).unwrap(), Some(root));
    }

    #[test]
    fn deep_cycles_are_rejected_when_strict() {
        let (mut hierarchy, root) = tree();
        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(a, b).unwrap();

        let err = hierarchy.add_child(b, root).unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected { .. }));
    }

    #[test]
    fn duplicate_sibling_names_are_rejected() {
        let (mut hierarchy, root) = tree();
        let first = hierarchy.create(Some("A")).unwrap();
        let second = hierarchy.create(Some("A")).unwrap();
        hierarchy.add_child(root, first).unwrap();
        assert!(matches!(
            hierarchy.add_child(root, second),
            Err(HierarchyError::DuplicateName { .. })
        ));
    }

    #[test]
    fn insert_child_respects_position() {
        let (mut hierarchy, root) = tree();
        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        let c = hierarchy.create(Some("C")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(root, c).unwrap();
        hierarchy.insert_child(root, 1, b).unwrap();
        assert_eq!(hierarchy.children(root).unwrap(), &[a, b, c]);

        let d = hierarchy.create(Some("D")).unwrap();
        assert!(matches!(
            hierarchy.insert_child(root, 9, d),
            Err(HierarchyError::IndexOutOfRange { index: 9, len: 3 })
        ));
    }

    #[test]
    fn detach_child_by_name_unlinks_without_destroying() {
        let (mut hierarchy, root) = tree();
        let registry = hierarchy.add_registry(SceneIndex::new());
        hierarchy.register_root(registry, root).unwrap();
        let child = hierarchy.create(Some("A")).unwrap();
        hierarchy.add_child(root, child).unwrap();

        let detached = hierarchy.detach_child(root, "A").unwrap();
        assert_eq!(detached, Some(child));
        assert!(hierarchy.contains(child));
        assert_eq!(hierarchy.parent(child).unwrap(), None);
        assert_eq!(hierarchy.registry_of(child).unwrap(), None);
        assert!(hierarchy.children(root).unwrap().is_empty());
        assert_eq!(hierarchy.detach_child(root, "A").unwrap(), None);
    }

    #[test]
    fn remove_child_by_id_destroys_it() {
        let (mut hierarchy, root) = tree();
        let child = hierarchy.create(Some("A")).unwrap();
        hierarchy.add_child(root, child).unwrap();
        let id = hierarchy.id(child).unwrap();

        assert!(hierarchy.remove_child(root, id).unwrap());
        assert!(!hierarchy.contains(child));
        assert_eq!(hierarchy.state(child), LifecycleState::Destroyed);
        assert!(!hierarchy.remove_child(root, id).unwrap());
    }

    #[test]
    fn reassigned_id_keeps_position_and_lookup() {
        let (mut hierarchy, root) = tree();
        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(root, b).unwrap();
        let old = hierarchy.id(a).unwrap();

        let external = EntityId::from_raw(9_000);
        hierarchy.set_entity_id(a, external).unwrap();

        assert_eq!(hierarchy.children(root).unwrap(), &[a, b]);
        assert_eq!(hierarchy.child_by_id(root, external).unwrap(), Some(a));
        assert_eq!(hierarchy.child_by_id(root, old).unwrap(), None);
        assert_eq!(hierarchy.entity_by_id(external), Some(a));

        let b_id = hierarchy.id(b).unwrap();
        assert!(matches!(
            hierarchy.set_entity_id(a, b_id),
            Err(HierarchyError::DuplicateEntityId { .. })
        ));
    }

    #[test]
    fn rename_rules_are_sibling_scoped() {
        let (mut hierarchy, root) = tree();
        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        let deep = hierarchy.create(Some("Deep")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(root, b).unwrap();
        hierarchy.add_child(b, deep).unwrap();

        // Unrelated node elsewhere in the tree.
        hierarchy.set_name(deep, "A").unwrap();
        assert_eq!(hierarchy.name(deep).unwrap(), "A");

        assert!(matches!(
            hierarchy.set_name(b, "A"),
            Err(HierarchyError::DuplicateName { .. })
        ));
        assert!(matches!(
            hierarchy.set_name(b, "A.x"),
            Err(HierarchyError::ReservedName { .. })
        ));
        assert!(matches!(
            hierarchy.set_name(b, "[parent]"),
            Err(HierarchyError::ReservedName { .. })
        ));
        assert!(matches!(hierarchy.set_name(b, ""), Err(HierarchyError::EmptyName)));
        assert_eq!(hierarchy.name(b).unwrap(), "B");
    }

    #[test]
    fn name_validator_can_veto_and_events_fire() {
        let (mut hierarchy, root) = tree();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        hierarchy
            .subscribe(root, move |event| sink.borrow_mut().push(event.clone()))
            .unwrap();
        hierarchy
            .set_name_validator(root, Some(Box::new(|_: Entity, name: &str| name.starts_with("Scene"))))
            .unwrap();

        assert!(matches!(
            hierarchy.set_name(root, "World"),
            Err(HierarchyError::NameRejected { .. })
        ));
        hierarchy.set_name(root, "SceneRoot").unwrap();
        hierarchy.set_tag(root, Some("level")).unwrap();

        let events = events.borrow();
        assert_eq!(
            events.as_slice(),
            &[
                HierarchyEvent::NameChanged {
                    entity: root,
                    old: "Root".to_string(),
                    new: "SceneRoot".to_string(),
                },
                HierarchyEvent::TagChanged {
                    entity: root,
                    old: None,
                    new: Some("level".to_string()),
                },
            ]
        );
    }

    #[test]
    fn child_events_reach_parent_observers() {
        let (mut hierarchy, root) = tree();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let subscription = hierarchy
            .subscribe(root, move |event| sink.borrow_mut().push(event.clone()))
            .unwrap();

        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(root, b).unwrap();
        hierarchy.set_sibling_index(b, 0).unwrap();
        hierarchy.detach_child(root, a).unwrap();
        assert!(hierarchy.unsubscribe(root, subscription).unwrap());
        hierarchy.add_child(root, a).unwrap();

        assert_eq!(
            events.borrow().as_slice(),
            &[
                HierarchyEvent::ChildAdded { parent: root, child: a },
                HierarchyEvent::ChildAdded { parent: root, child: b },
                HierarchyEvent::ChildOrderChanged {
                    parent: root,
                    child: b,
                    from: 1,
                    to: 0,
                },
                HierarchyEvent::ChildDetached { parent: root, child: a },
            ]
        );
    }

    #[test]
    fn disabled_ancestor_disables_every_descendant() {
        let (mut hierarchy, root) = tree();
        let a = hierarchy.create(Some("A")).unwrap();
        let b = hierarchy.create(Some("B")).unwrap();
        hierarchy.add_child(root, a).unwrap();
        hierarchy.add_child(a, b).unwrap();

        hierarchy.set_enabled(a, false).unwrap();
        hierarchy.set_enabled(b, true).unwrap();
        assert!(hierarchy.is_hierarchy_enabled(root).unwrap());
        assert!(!hierarchy.is_hierarchy_enabled(a).unwrap());
        assert!(!hierarchy.is_hierarchy_enabled(b).unwrap());
        assert!(hierarchy.is_enabled(b).unwrap());

        // A detached subtree is re-evaluated against its implicit enabled parent.
        hierarchy.detach_child(root, a).unwrap();
        hierarchy.set_enabled(a, true).unwrap();
        assert!(hierarchy.is_hierarchy_enabled(b).unwrap());
    }

    #[test]
    fn default_names_come_from_owned_counter() {
        let mut hierarchy = Hierarchy::new();
        let first = hierarchy.create(None).unwrap();
        let second = hierarchy.create(None).unwrap();
        assert_eq!(hierarchy.name(first).unwrap(), "Entity 1");
        assert_eq!(hierarchy.name(second).unwrap(), "Entity 2");

        let mut other = Hierarchy::new();
        let fresh = other.create(None).unwrap();
        assert_eq!(other.name(fresh).unwrap(), "Entity 1");
    }

    #[test]
    fn stale_handles_fail_fast_after_slot_reuse() {
        let mut hierarchy = Hierarchy::new();
        let old = hierarchy.create(Some("Old")).unwrap();
        hierarchy.destroy(old).unwrap();
        let reused = hierarchy.create(Some("New")).unwrap();

        assert_eq!(reused.index(), old.index());
        assert_ne!(reused.generation(), old.generation());
        assert!(matches!(hierarchy.name(old), Err(HierarchyError::Destroyed(_))));
        assert_eq!(hierarchy.name(reused).unwrap(), "New");
    }
}
