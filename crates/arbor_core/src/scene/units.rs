// units.rs - Adding, removing and looking up components on an entity

use crate::error::{HierarchyError, Result};
use crate::lifecycle::{LifecycleState, Transition};
use crate::scene::component::ComponentSlot;
use crate::scene::{
    Component, ComponentId, ComponentQuery, DetachedComponent, Entity, Hierarchy, HierarchyEvent,
};
use std::any::TypeId;

impl Hierarchy {
    /// Attach a boxed component to `entity` and bring it up to the entity's
    /// lifecycle state.
    ///
    /// Fails if the concrete type is already present and does not allow
    /// multiple instances.
    pub fn add_component(
        &mut self,
        entity: Entity,
        behavior: Box<dyn Component>,
    ) -> Result<ComponentId> {
        self.check_singleton(entity, behavior.as_ref())?;
        let id = self.allocator.next_component();
        self.insert_slot(entity, ComponentSlot::new(id, behavior))
    }

    pub fn add<T: Component>(&mut self, entity: Entity, component: T) -> Result<ComponentId> {
        self.add_component(entity, Box::new(component))
    }

    /// Re-attach a component previously detached from this or another entity.
    /// It keeps its id and resumes from its detached state.
    pub fn add_detached(
        &mut self,
        entity: Entity,
        component: DetachedComponent,
    ) -> Result<ComponentId> {
        if self.component_owners.contains_key(&component.id()) {
            return Err(HierarchyError::DuplicateComponentId { id: component.id() });
        }
        let slot = ComponentSlot::from_detached(component);
        self.check_singleton(entity, slot.behavior())?;
        self.allocator.observe_component(slot.id);
        self.insert_slot(entity, slot)
    }

    fn check_singleton(&self, entity: Entity, behavior: &dyn Component) -> Result<()> {
        let node = self.node(entity)?;
        if behavior.allows_multiple() {
            return Ok(());
        }
        let type_id = behavior.as_any().type_id();
        if node.units.iter().any(|unit| unit.type_id == type_id) {
            return Err(HierarchyError::DuplicateComponent {
                entity,
                type_name: behavior.type_name(),
            });
        }
        Ok(())
    }

    fn insert_slot(&mut self, entity: Entity, slot: ComponentSlot) -> Result<ComponentId> {
        let id = slot.id;
        let (index, state) = {
            let node = self.node_mut(entity)?;
            node.units.push(slot);
            (node.units.len() - 1, node.lifecycle.state())
        };
        self.component_owners.insert(id, entity);

        let caught_up = self.catch_up_unit(entity, index, state);
        self.emit(
            entity,
            HierarchyEvent::ComponentAdded {
                entity,
                component: id,
            },
        );
        caught_up.map(|_| id)
    }

    fn catch_up_unit(&mut self, entity: Entity, index: usize, node_state: LifecycleState) -> Result<()> {
        let unit_state = |tree: &Self| -> Result<(LifecycleState, bool)> {
            let slot = &tree.node(entity)?.units[index];
            Ok((slot.lifecycle.state(), slot.enabled))
        };

        if node_state != LifecycleState::Unloaded && unit_state(self)?.0 == LifecycleState::Unloaded {
            self.step_unit(entity, index, Transition::Load)?;
        }
        if node_state.is_attached()
            && matches!(
                unit_state(self)?.0,
                LifecycleState::Loaded | LifecycleState::Detached
            )
            && !self.step_unit(entity, index, Transition::Attach)?
        {
            let id = self.node(entity)?.units[index].id;
            self.report_unattached(entity, &[id]);
            return Ok(());
        }
        let (state, enabled) = unit_state(self)?;
        if node_state.is_active()
            && enabled
            && matches!(state, LifecycleState::Attached | LifecycleState::Deactivated)
        {
            self.step_unit(entity, index, Transition::Activate)?;
        }
        if node_state == LifecycleState::Started
            && unit_state(self)?.0 == LifecycleState::Activated
        {
            self.step_unit(entity, index, Transition::Start)?;
        }
        Ok(())
    }

    // ── Removal ───────────────────────────────────────────────────────

    /// Destroy and remove a component. Returns `false` if `entity` does not
    /// own it.
    pub fn remove_component(&mut self, entity: Entity, id: ComponentId) -> Result<bool> {
        let Some(index) = self.node(entity)?.unit_index(id) else {
            return Ok(false);
        };
        let teardown = self.force_unit(entity, index, LifecycleState::Destroyed);
        self.node_mut(entity)?.units.remove(index);
        self.component_owners.remove(&id);
        self.emit(
            entity,
            HierarchyEvent::ComponentDetached {
                entity,
                component: id,
            },
        );
        teardown.map(|_| true)
    }

    /// Remove the first component of exactly type `T`.
    pub fn remove_component_of<T: Component>(&mut self, entity: Entity) -> Result<bool> {
        self.remove_matching(entity, ComponentQuery::exact::<T>())
    }

    /// Remove the first component matching `query`.
    pub fn remove_matching(&mut self, entity: Entity, query: ComponentQuery) -> Result<bool> {
        match self.find_component(entity, query)? {
            Some(id) => self.remove_component(entity, id),
            None => Ok(false),
        }
    }

    /// Take a component off `entity` without destroying it.
    ///
    /// The component is torn down to `Detached` first. If a teardown callback
    /// failure is rethrown the component stays where it was.
    pub fn detach_component(
        &mut self,
        entity: Entity,
        id: ComponentId,
    ) -> Result<Option<DetachedComponent>> {
        let Some(index) = self.node(entity)?.unit_index(id) else {
            return Ok(None);
        };
        self.force_unit(entity, index, LifecycleState::Detached)?;
        let slot = self.node_mut(entity)?.units.remove(index);
        self.component_owners.remove(&id);
        self.emit(
            entity,
            HierarchyEvent::ComponentDetached {
                entity,
                component: id,
            },
        );
        Ok(Some(slot.into_detached()))
    }

    pub fn detach_component_of<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<Option<DetachedComponent>> {
        self.detach_matching(entity, ComponentQuery::exact::<T>())
    }

    pub fn detach_matching(
        &mut self,
        entity: Entity,
        query: ComponentQuery,
    ) -> Result<Option<DetachedComponent>> {
        match self.find_component(entity, query)? {
            Some(id) => self.detach_component(entity, id),
            None => Ok(None),
        }
    }

    // ── Per-component state ───────────────────────────────────────────

    fn slot_index(&self, entity: Entity, id: ComponentId) -> Result<usize> {
        self.node(entity)?
            .unit_index(id)
            .ok_or(HierarchyError::UnknownComponent { entity, id })
    }

    pub fn component_state(&self, entity: Entity, id: ComponentId) -> Result<LifecycleState> {
        let index = self.slot_index(entity, id)?;
        Ok(self.node(entity)?.units[index].lifecycle.state())
    }

    pub fn is_component_enabled(&self, entity: Entity, id: ComponentId) -> Result<bool> {
        let index = self.slot_index(entity, id)?;
        Ok(self.node(entity)?.units[index].enabled)
    }

    /// Toggle a single component.
    ///
    /// On an active entity, disabling deactivates the component and enabling
    /// activates it again (and starts it if the entity is started).
    pub fn set_component_enabled(
        &mut self,
        entity: Entity,
        id: ComponentId,
        enabled: bool,
    ) -> Result<()> {
        let index = self.slot_index(entity, id)?;
        let (node_state, unit_state) = {
            let node = self.node_mut(entity)?;
            let slot = &mut node.units[index];
            if slot.enabled == enabled {
                return Ok(());
            }
            slot.enabled = enabled;
            (node.lifecycle.state(), slot.lifecycle.state())
        };

        if !enabled {
            if unit_state.is_active() {
                self.step_unit(entity, index, Transition::Deactivate)?;
            }
            return Ok(());
        }
        if node_state.is_active()
            && matches!(
                unit_state,
                LifecycleState::Attached | LifecycleState::Deactivated
            )
        {
            self.step_unit(entity, index, Transition::Activate)?;
            if node_state == LifecycleState::Started {
                self.step_unit(entity, index, Transition::Start)?;
            }
        }
        Ok(())
    }

    /// Reassign a component id, e.g. to match ids from a saved scene.
    pub fn set_component_id(
        &mut self,
        entity: Entity,
        id: ComponentId,
        new_id: ComponentId,
    ) -> Result<()> {
        let index = self.slot_index(entity, id)?;
        if id == new_id {
            return Ok(());
        }
        if self.component_owners.contains_key(&new_id) {
            return Err(HierarchyError::DuplicateComponentId { id: new_id });
        }
        self.node_mut(entity)?.units[index].id = new_id;
        self.component_owners.remove(&id);
        self.component_owners.insert(new_id, entity);
        self.allocator.observe_component(new_id);
        Ok(())
    }

    /// Entity currently owning the component, if any.
    pub fn component_owner(&self, id: ComponentId) -> Option<Entity> {
        self.component_owners.get(&id).copied()
    }

    // ── Access ────────────────────────────────────────────────────────

    pub fn component_ids(&self, entity: Entity) -> Result<Vec<ComponentId>> {
        Ok(self.node(entity)?.units.iter().map(|unit| unit.id).collect())
    }

    /// First component of exactly type `T`.
    pub fn component<T: Component>(&self, entity: Entity) -> Result<Option<&T>> {
        let type_id = TypeId::of::<T>();
        Ok(self
            .node(entity)?
            .units
            .iter()
            .find(|unit| unit.type_id == type_id)
            .and_then(|unit| unit.downcast_ref::<T>()))
    }

    pub fn component_mut<T: Component>(&mut self, entity: Entity) -> Result<Option<&mut T>> {
        let type_id = TypeId::of::<T>();
        Ok(self
            .node_mut(entity)?
            .units
            .iter_mut()
            .find(|unit| unit.type_id == type_id)
            .and_then(|unit| unit.downcast_mut::<T>()))
    }

    /// Component by id, if it has type `T`.
    pub fn component_by_id<T: Component>(
        &self,
        entity: Entity,
        id: ComponentId,
    ) -> Result<Option<&T>> {
        let index = self.slot_index(entity, id)?;
        Ok(self.node(entity)?.units[index].downcast_ref::<T>())
    }

    /// Component by id as a trait object.
    pub fn component_dyn(&self, entity: Entity, id: ComponentId) -> Result<&dyn Component> {
        let index = self.slot_index(entity, id)?;
        Ok(self.node(entity)?.units[index].behavior())
    }
}
