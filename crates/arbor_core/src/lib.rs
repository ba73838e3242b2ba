//! Arbor Core
//!
//! Node/attachment lifecycle engine for a scene graph:
//! - Lifecycle state machine shared by nodes and components
//! - Entity hierarchy with ordered children and owned components
//! - Id/name/tag indexing and path addressing
//! - Per-component failure containment

pub mod error;
pub mod lifecycle;
pub mod scene;
pub mod settings;

pub use error::{HierarchyError, Result, UnitError, UnitResult};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleState, Transition};
pub use settings::HierarchySettings;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
