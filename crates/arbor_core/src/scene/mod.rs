//! Scene hierarchy: entities, components and the lifecycle engine driving them.
//!
//! The [`Hierarchy`] is an arena owning every node. Nodes own their children
//! and components; parents and registries are non-owning back-references.
//! All lifecycle propagation is synchronous and single-threaded: a command on
//! a node returns once its whole subtree has finished the transition.

mod capture;
mod component;
mod entity;
mod events;
mod hierarchy;
mod node;
mod path;
mod propagate;
mod query;
mod registry;
mod template;
#[cfg(test)]
mod testing;
mod units;

pub use capture::{CaptureDecision, CaptureHook, UnitFailure, UnitPhase};
pub use component::{AsAny, Component, ComponentQuery, DetachedComponent, Kind, UnitContext};
pub use entity::{ComponentId, Entity, EntityId};
pub use events::{HierarchyEvent, NameValidator, SubscriptionId};
pub use hierarchy::{ChildRef, Hierarchy};
pub use path::{PARENT_TOKEN, PATH_SEPARATOR, SELF_TOKEN};
pub use query::SearchOptions;
pub use registry::{RegistryId, SceneIndex, SceneRegistry};
pub use template::{TemplateInstantiator, TemplateRef};
