// propagate.rs - Lifecycle commands and subtree sweeps
//
// Every sweep visits a node first, then its components in insertion order,
// then its children in sibling order (pre-order). A component callback error
// goes through the capture hook; `Suppress` keeps the sweep going, `Rethrow`
// aborts it and hands the error back to the caller.

use crate::error::{HierarchyError, Result, UnitResult};
use crate::lifecycle::{LifecycleError, LifecycleState, Transition};
use crate::scene::capture::{CaptureDecision, UnitFailure, UnitPhase};
use crate::scene::component::{ComponentSlot, UnitContext};
use crate::scene::hierarchy::record_mut;
use crate::scene::node::NodeRecord;
use crate::scene::{ComponentId, Entity, Hierarchy};

fn counter_key(transition: Transition) -> &'static str {
    match transition {
        Transition::Load => "transitions.load",
        Transition::Attach => "transitions.attach",
        Transition::Activate => "transitions.activate",
        Transition::Start => "transitions.start",
        Transition::Deactivate => "transitions.deactivate",
        Transition::Detach => "transitions.detach",
        Transition::Destroy => "transitions.destroy",
    }
}

impl Hierarchy {
    // ── Commands ──────────────────────────────────────────────────────

    /// Load a subtree. Already loaded descendants are left alone.
    pub fn load(&mut self, entity: Entity) -> Result<()> {
        self.node(entity)?.lifecycle.check(Transition::Load)?;
        self.timed("load", |tree| tree.sweep(entity, Transition::Load))
    }

    /// Attach a subtree. The node needs a parent or a registry.
    pub fn attach(&mut self, entity: Entity) -> Result<()> {
        let node = self.node(entity)?;
        if node.parent.is_none() && node.registry.is_none() {
            return Err(HierarchyError::NoOwner { entity });
        }
        node.lifecycle.check(Transition::Attach)?;
        self.timed("attach", |tree| tree.sweep(entity, Transition::Attach))
    }

    /// Activate a subtree.
    ///
    /// Nodes that are not hierarchy-enabled are skipped along with their
    /// descendants and stay attached.
    pub fn activate(&mut self, entity: Entity) -> Result<()> {
        let node = self.node(entity)?;
        if !node.hierarchy_enabled {
            return Ok(());
        }
        node.lifecycle.check(Transition::Activate)?;
        self.timed("activate", |tree| tree.sweep(entity, Transition::Activate))
    }

    /// Start an activated subtree. Inactive descendants are skipped.
    pub fn start(&mut self, entity: Entity) -> Result<()> {
        self.node(entity)?.lifecycle.check(Transition::Start)?;
        self.timed("start", |tree| tree.sweep(entity, Transition::Start))
    }

    /// Deactivate a subtree. No-op for anything not active.
    pub fn deactivate(&mut self, entity: Entity) -> Result<()> {
        self.node(entity)?;
        self.timed("deactivate", |tree| tree.sweep(entity, Transition::Deactivate))
    }

    /// Tear a subtree down to `Detached` without unlinking it.
    pub fn detach(&mut self, entity: Entity) -> Result<()> {
        self.force_state(entity, LifecycleState::Detached)
    }

    /// Destroy a node and everything below it.
    ///
    /// The node is first unlinked from its parent (or registry); its
    /// components are force-destroyed, then its children, then the node
    /// itself. The handle is invalid afterwards.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        let node = self.node(entity)?;
        let (parent, registered) = (node.parent, node.registry.is_some());
        if let Some(parent) = parent {
            self.detach_child(parent, entity)?;
        } else if registered {
            self.unregister_root(entity)?;
        }
        self.timed("destroy", |tree| tree.destroy_subtree(entity))
    }

    /// Drive a subtree through every intermediate transition down to
    /// `Detached` or `Destroyed`.
    pub fn force_state(&mut self, entity: Entity, target: LifecycleState) -> Result<()> {
        match target {
            LifecycleState::Detached => {
                self.node(entity)?;
                self.timed("detach", |tree| tree.force_subtree(entity, target))
            }
            LifecycleState::Destroyed => self.destroy(entity),
            target => Err(LifecycleError::InvalidForceTarget { target }.into()),
        }
    }

    /// Tick every started, enabled component in the subtree.
    pub fn update(&mut self, entity: Entity, dt: f32) -> Result<()> {
        self.node(entity)?;
        self.timed("update", |tree| tree.tick(entity, dt))
    }

    /// Cycle a node's own components through detach and back up to the
    /// node's current state. Children are not touched.
    pub fn reattach_components(&mut self, entity: Entity) -> Result<()> {
        let state = self.node(entity)?.lifecycle.state();
        self.sweep_units(entity, Transition::Deactivate)?;
        self.sweep_units(entity, Transition::Detach)?;
        if state.is_attached() {
            self.sweep_units(entity, Transition::Attach)?;
        }
        if state.is_active() {
            self.sweep_units(entity, Transition::Activate)?;
        }
        if state == LifecycleState::Started {
            self.sweep_units(entity, Transition::Start)?;
        }
        Ok(())
    }

    // ── Sweeps ────────────────────────────────────────────────────────

    fn timed<F>(&mut self, name: &'static str, sweep: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let timer = self.profiler.begin();
        let result = sweep(self);
        self.profiler.end(name, timer);
        result
    }

    /// Bring a freshly linked subtree up to its owner's state.
    pub(crate) fn catch_up(&mut self, entity: Entity, owner_state: LifecycleState) -> Result<()> {
        if owner_state.is_attached() {
            self.sweep(entity, Transition::Attach)?;
        }
        if owner_state.is_active() {
            self.sweep(entity, Transition::Activate)?;
        }
        if owner_state == LifecycleState::Started {
            self.sweep(entity, Transition::Start)?;
        }
        Ok(())
    }

    pub(crate) fn force_subtree(&mut self, entity: Entity, target: LifecycleState) -> Result<()> {
        match target {
            LifecycleState::Detached => {
                self.sweep(entity, Transition::Deactivate)?;
                self.sweep(entity, Transition::Detach)
            }
            LifecycleState::Destroyed => self.destroy(entity),
            target => Err(LifecycleError::InvalidForceTarget { target }.into()),
        }
    }

    fn sweep(&mut self, entity: Entity, transition: Transition) -> Result<()> {
        let node = self.node_mut(entity)?;
        let from = node.lifecycle.state();
        let skip = match transition {
            Transition::Load => from != LifecycleState::Unloaded,
            Transition::Activate => !node.hierarchy_enabled,
            Transition::Start => !from.is_active(),
            _ => false,
        };
        if skip {
            return Ok(());
        }
        // A descendant parked in a state the transition cannot leave (e.g.
        // force-detached under an active parent) sits the sweep out.
        let Ok(changed) = node.lifecycle.check(transition) else {
            return Ok(());
        };
        if changed {
            node.lifecycle.apply(transition)?;
            self.note_transition(entity, transition, from);
        }

        self.sweep_units(entity, transition)?;

        let children = self.node(entity)?.children.clone();
        for child in children {
            self.sweep(child, transition)?;
        }
        Ok(())
    }

    fn note_transition(&mut self, entity: Entity, transition: Transition, from: LifecycleState) {
        self.counters.increment(counter_key(transition), 1);
        tracing::debug!(
            entity = %entity,
            from = %from,
            to = %transition.target(),
            "entity transition"
        );
    }

    /// Move a node's components one step along with the node.
    pub(crate) fn sweep_units(&mut self, entity: Entity, transition: Transition) -> Result<()> {
        let count = self.node(entity)?.units.len();
        let mut unattached = Vec::new();

        for index in 0..count {
            let (state, enabled, id) = {
                let slot = &self.node(entity)?.units[index];
                (slot.lifecycle.state(), slot.enabled, slot.id)
            };
            match transition {
                Transition::Load if state == LifecycleState::Unloaded => {
                    self.step_unit(entity, index, transition)?;
                }
                Transition::Attach
                    if matches!(state, LifecycleState::Loaded | LifecycleState::Detached) =>
                {
                    if !self.step_unit(entity, index, transition)? {
                        unattached.push(id);
                    }
                }
                Transition::Activate
                    if enabled
                        && matches!(state, LifecycleState::Attached | LifecycleState::Deactivated) =>
                {
                    self.step_unit(entity, index, transition)?;
                }
                Transition::Start if state == LifecycleState::Activated => {
                    self.step_unit(entity, index, transition)?;
                }
                Transition::Deactivate if state.is_active() => {
                    self.step_unit(entity, index, transition)?;
                }
                Transition::Detach => self.force_unit(entity, index, LifecycleState::Detached)?,
                Transition::Destroy => self.force_unit(entity, index, LifecycleState::Destroyed)?,
                _ => {}
            }
        }

        if !unattached.is_empty() {
            self.report_unattached(entity, &unattached);
        }
        Ok(())
    }

    pub(crate) fn report_unattached(&mut self, entity: Entity, unattached: &[ComponentId]) {
        self.counters.increment("units.unattached", unattached.len());
        if self.settings.warn_unattached_units {
            tracing::warn!(
                entity = %entity,
                count = unattached.len(),
                components = ?unattached,
                "components failed to attach"
            );
        }
    }

    /// Apply one transition to one component and run its callback.
    ///
    /// Returns `Ok(false)` when the callback failed and the failure was
    /// suppressed. A failed attach rolls the component back to its previous
    /// state.
    pub(crate) fn step_unit(
        &mut self,
        entity: Entity,
        index: usize,
        transition: Transition,
    ) -> Result<bool> {
        let previous = {
            let slot = &mut self.node_mut(entity)?.units[index];
            let previous = slot.lifecycle.state();
            if !slot.lifecycle.apply(transition)? {
                return Ok(true);
            }
            previous
        };
        let Some(phase) = UnitPhase::from_transition(transition) else {
            return Ok(true);
        };

        let outcome = self.run_callback(entity, index, phase, |slot, ctx| {
            slot.invoke(transition, ctx)
        });
        if transition == Transition::Attach && !matches!(outcome, Ok(true)) {
            if let Ok(node) = self.node_mut(entity) {
                node.units[index].lifecycle.restore(previous);
            }
        }
        outcome
    }

    /// Walk one component down to `Detached` or `Destroyed`.
    pub(crate) fn force_unit(
        &mut self,
        entity: Entity,
        index: usize,
        target: LifecycleState,
    ) -> Result<()> {
        let path = self.node(entity)?.units[index]
            .lifecycle
            .teardown_path(target)?;
        for transition in path {
            self.step_unit(entity, index, transition)?;
        }
        Ok(())
    }

    /// Invoke a component callback with the capture hook in the loop.
    fn run_callback<F>(
        &mut self,
        entity: Entity,
        index: usize,
        phase: UnitPhase,
        callback: F,
    ) -> Result<bool>
    where
        F: FnOnce(&mut ComponentSlot, &UnitContext<'_>) -> UnitResult,
    {
        let Self {
            slots,
            capture,
            counters,
            ..
        } = self;
        let NodeRecord {
            id: owner_id,
            name,
            units,
            ..
        } = record_mut(slots, entity)?;
        let slot = &mut units[index];
        let ctx = UnitContext {
            owner: entity,
            owner_id: *owner_id,
            owner_name: name.as_str(),
            component: slot.id,
        };

        let Err(error) = callback(slot, &ctx) else {
            return Ok(true);
        };
        counters.increment("units.captured", 1);
        let failure = UnitFailure {
            entity,
            entity_id: *owner_id,
            component: slot.id,
            type_name: slot.type_name,
            phase,
            error: &error,
        };
        match capture.decide(&failure) {
            CaptureDecision::Suppress => Ok(false),
            CaptureDecision::Rethrow => Err(HierarchyError::Unit {
                entity,
                component: slot.id,
                phase,
                source: error,
            }),
        }
    }

    fn tick(&mut self, entity: Entity, dt: f32) -> Result<()> {
        let node = self.node(entity)?;
        if node.lifecycle.state() != LifecycleState::Started || !node.hierarchy_enabled {
            return Ok(());
        }
        let count = node.units.len();
        for index in 0..count {
            let slot = &self.node(entity)?.units[index];
            if slot.enabled && slot.lifecycle.state() == LifecycleState::Started {
                self.run_callback(entity, index, UnitPhase::Update, |slot, ctx| {
                    slot.update(ctx, dt)
                })?;
            }
        }

        let children = self.node(entity)?.children.clone();
        for child in children {
            self.tick(child, dt)?;
        }
        Ok(())
    }

    fn destroy_subtree(&mut self, entity: Entity) -> Result<()> {
        let from = self.node(entity)?.lifecycle.state();
        let count = self.node(entity)?.units.len();
        for index in 0..count {
            self.force_unit(entity, index, LifecycleState::Destroyed)?;
        }

        let (units, children) = {
            let node = self.node_mut(entity)?;
            node.child_ids.clear();
            (
                std::mem::take(&mut node.units),
                std::mem::take(&mut node.children),
            )
        };
        for unit in &units {
            self.component_owners.remove(&unit.id);
        }
        for child in children {
            self.destroy_subtree(child)?;
        }

        let node = self.node_mut(entity)?;
        for transition in node.lifecycle.teardown_path(LifecycleState::Destroyed)? {
            node.lifecycle.apply(transition)?;
        }
        self.note_transition(entity, Transition::Destroy, from);
        self.release(entity);
        Ok(())
    }
}
