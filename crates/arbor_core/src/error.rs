use crate::lifecycle::LifecycleError;
use crate::scene::{ComponentId, Entity, EntityId, RegistryId, UnitPhase};
use thiserror::Error;

/// Failure raised by a component callback.
pub type UnitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return type of every component callback.
pub type UnitResult = std::result::Result<(), UnitError>;

pub type Result<T, E = HierarchyError> = std::result::Result<T, E>;

/// Errors surfaced by hierarchy operations.
///
/// Everything except [`HierarchyError::Unit`] is a usage error: it is raised
/// synchronously, before any structural change, and never passes through the
/// capture hook.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("entity {0} has been destroyed")]
    Destroyed(Entity),

    #[error("entity id {id} is already in use")]
    DuplicateEntityId { id: EntityId },

    #[error("component id {id} is already in use")]
    DuplicateComponentId { id: ComponentId },

    #[error("entity {entity} already has a `{type_name}` component")]
    DuplicateComponent {
        entity: Entity,
        type_name: &'static str,
    },

    #[error("entity {entity} cannot be added to itself")]
    SelfParent { entity: Entity },

    #[error("entity {child} is an ancestor of {parent}")]
    CycleDetected { parent: Entity, child: Entity },

    #[error("entity {child} already has a parent or registry")]
    AlreadyParented { child: Entity },

    #[error("entity {child} is not a child of {parent}")]
    NotAChild { parent: Entity, child: Entity },

    #[error("entity {entity} has no parent or registry to attach to")]
    NoOwner { entity: Entity },

    #[error("name must not be empty")]
    EmptyName,

    #[error("name `{name}` contains reserved token `{token}`")]
    ReservedName { name: String, token: &'static str },

    #[error("name `{name}` was rejected by the name validator")]
    NameRejected { name: String },

    #[error("a sibling named `{name}` already exists")]
    DuplicateName { name: String },

    #[error("component {id} is not owned by entity {entity}")]
    UnknownComponent { entity: Entity, id: ComponentId },

    #[error("registry {0} is not known")]
    UnknownRegistry(RegistryId),

    #[error("index {index} is out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("component {component} on entity {entity} failed during {phase}: {source}")]
    Unit {
        entity: Entity,
        component: ComponentId,
        phase: UnitPhase,
        #[source]
        source: UnitError,
    },

    #[error("template instantiation failed: {0}")]
    Template(#[source] UnitError),
}

impl HierarchyError {
    /// True for errors caused by the caller rather than by a component.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::Unit { .. } | Self::Template(_))
    }
}
