// template.rs - Template instance roots and in-place refresh

use crate::error::{HierarchyError, Result, UnitError};
use crate::lifecycle::LifecycleState;
use crate::scene::{Entity, Hierarchy, RegistryId};
use serde::{Deserialize, Serialize};

/// Reference to the template an instance root was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub source: String,
    pub revision: u32,
}

impl TemplateRef {
    pub fn new(source: impl Into<String>, revision: u32) -> Self {
        Self {
            source: source.into(),
            revision,
        }
    }
}

/// Builds a fresh, detached subtree from a template.
pub trait TemplateInstantiator {
    fn instantiate(
        &mut self,
        template: &TemplateRef,
        tree: &mut Hierarchy,
    ) -> std::result::Result<Entity, UnitError>;
}

/// Where an instance sat before it was taken out for a refresh.
enum Placement {
    Child { parent: Entity, index: usize },
    Root(RegistryId),
    Free,
}

impl Hierarchy {
    pub fn template(&self, entity: Entity) -> Result<Option<&TemplateRef>> {
        Ok(self.node(entity)?.template.as_ref())
    }

    /// Mark (or unmark) `entity` as the root of a template instance.
    pub fn set_template(&mut self, entity: Entity, template: Option<TemplateRef>) -> Result<()> {
        self.node_mut(entity)?.template = template;
        Ok(())
    }

    /// Swap an instance root for a fresh instance of `template`.
    ///
    /// The replacement takes the old instance's place (same parent and
    /// sibling index, or same registry) and reaches the same lifecycle state;
    /// the old instance is destroyed. A node that is not an instance root only
    /// records the new reference. If instantiation fails the old instance is
    /// put back.
    pub fn refresh_template(
        &mut self,
        entity: Entity,
        template: TemplateRef,
        instantiator: &mut dyn TemplateInstantiator,
    ) -> Result<Entity> {
        let node = self.node(entity)?;
        let Some(current) = node.template.as_ref() else {
            self.node_mut(entity)?.template = Some(template);
            return Ok(entity);
        };
        if *current == template {
            return Ok(entity);
        }

        let node = self.node(entity)?;
        let state = node.lifecycle.state();
        let placement = match (node.parent, node.registry) {
            (Some(parent), _) => Placement::Child {
                parent,
                index: self.sibling_index(entity)?.unwrap_or(0),
            },
            (None, Some(registry)) => Placement::Root(registry),
            (None, None) => Placement::Free,
        };
        self.take_out(entity, &placement)?;

        match instantiator.instantiate(&template, self) {
            Ok(replacement) => {
                self.node_mut(replacement)?.template = Some(template);
                self.put_back(replacement, &placement, state)?;
                self.destroy(entity)?;
                tracing::info!(old = %entity, new = %replacement, "template instance refreshed");
                Ok(replacement)
            }
            Err(error) => {
                self.put_back(entity, &placement, state)?;
                Err(HierarchyError::Template(error))
            }
        }
    }

    fn take_out(&mut self, entity: Entity, placement: &Placement) -> Result<()> {
        match placement {
            Placement::Child { parent, .. } => {
                self.detach_child(*parent, entity)?;
            }
            Placement::Root(_) => {
                self.unregister_root(entity)?;
            }
            Placement::Free => {}
        }
        Ok(())
    }

    fn put_back(&mut self, entity: Entity, placement: &Placement, state: LifecycleState) -> Result<()> {
        match placement {
            Placement::Child { parent, index } => self.insert_child(*parent, *index, entity),
            Placement::Root(registry) => {
                self.register_root(*registry, entity)?;
                self.catch_up(entity, state)
            }
            Placement::Free => Ok(()),
        }
    }
}
