//! Components: units of behavior owned by exactly one entity.
//!
//! A component is moved into its entity, so a second owner is impossible by
//! construction. Callbacks run synchronously as the owning entity moves
//! through its lifecycle; a callback error is routed through the capture hook
//! instead of aborting the sweep.

use crate::error::UnitResult;
use crate::lifecycle::{Lifecycle, LifecycleState, Transition};
use crate::scene::{ComponentId, Entity, EntityId};
use std::any::{Any, TypeId};
use std::fmt;

/// Dynamic type access for boxed trait objects.
///
/// Implemented for every `'static` type; call it through a `&dyn Component`
/// (not a `Box`) so the concrete type is reported.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Capability marker used for "assignable type" queries.
///
/// A kind is the `TypeId` of any `'static` type, typically a trait object
/// such as `dyn Drawable`. Components opt in by overriding
/// [`Component::provides`].
#[derive(Clone, Copy)]
pub struct Kind {
    id: TypeId,
    name: &'static str,
}

impl Kind {
    pub fn of<M: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    #[inline]
    pub fn is<M: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<M>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kind {}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Kind").field(&self.name).finish()
    }
}

/// Read-only view of the owner handed to every callback.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'a> {
    pub owner: Entity,
    pub owner_id: EntityId,
    pub owner_name: &'a str,
    pub component: ComponentId,
}

/// Contract every behavior unit implements.
///
/// All callbacks default to doing nothing.
pub trait Component: AsAny {
    /// Allow more than one instance of this concrete type per entity.
    fn allows_multiple(&self) -> bool {
        false
    }

    /// Whether this component satisfies an assignable-type query for `kind`.
    fn provides(&self, kind: &Kind) -> bool {
        let _ = kind;
        false
    }

    fn on_attach(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    fn on_activate(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    fn on_start(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    fn on_deactivate(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    fn on_detach(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    fn on_destroy(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        let _ = ctx;
        Ok(())
    }

    /// Periodic tick, only delivered while started and enabled.
    fn update(&mut self, ctx: &UnitContext<'_>, dt: f32) -> UnitResult {
        let _ = (ctx, dt);
        Ok(())
    }
}

/// Lookup mode for component queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentQuery {
    /// Concrete type must match exactly.
    Exact(TypeId),
    /// Concrete type equals the kind, or the component provides it.
    Kind(Kind),
}

impl ComponentQuery {
    pub fn exact<T: Component>() -> Self {
        Self::Exact(TypeId::of::<T>())
    }

    pub fn kind<M: ?Sized + 'static>() -> Self {
        Self::Kind(Kind::of::<M>())
    }

    pub(crate) fn matches(&self, slot: &ComponentSlot) -> bool {
        match self {
            Self::Exact(type_id) => slot.type_id == *type_id,
            Self::Kind(kind) => slot.type_id == kind.id || slot.behavior().provides(kind),
        }
    }
}

/// A component removed from its entity without being destroyed.
pub struct DetachedComponent {
    id: ComponentId,
    lifecycle: Lifecycle,
    enabled: bool,
    behavior: Box<dyn Component>,
}

impl DetachedComponent {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        let behavior: &dyn Component = &*self.behavior;
        behavior.as_any().downcast_ref::<T>()
    }

    /// Give up the component id and lifecycle, keeping only the behavior.
    pub fn into_inner(self) -> Box<dyn Component> {
        self.behavior
    }
}

impl fmt::Debug for DetachedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let behavior: &dyn Component = &*self.behavior;
        f.debug_struct("DetachedComponent")
            .field("id", &self.id)
            .field("state", &self.lifecycle.state())
            .field("type", &behavior.type_name())
            .finish()
    }
}

/// Storage for one component inside its entity.
pub(crate) struct ComponentSlot {
    pub id: ComponentId,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub lifecycle: Lifecycle,
    pub enabled: bool,
    behavior: Box<dyn Component>,
}

impl ComponentSlot {
    pub fn new(id: ComponentId, behavior: Box<dyn Component>) -> Self {
        Self::with_lifecycle(id, Lifecycle::new(), true, behavior)
    }

    fn with_lifecycle(
        id: ComponentId,
        lifecycle: Lifecycle,
        enabled: bool,
        behavior: Box<dyn Component>,
    ) -> Self {
        let (type_id, type_name) = {
            let dynamic: &dyn Component = &*behavior;
            (dynamic.as_any().type_id(), dynamic.type_name())
        };
        Self {
            id,
            type_id,
            type_name,
            lifecycle,
            enabled,
            behavior,
        }
    }

    pub fn from_detached(detached: DetachedComponent) -> Self {
        Self::with_lifecycle(
            detached.id,
            detached.lifecycle,
            detached.enabled,
            detached.behavior,
        )
    }

    pub fn into_detached(self) -> DetachedComponent {
        DetachedComponent {
            id: self.id,
            lifecycle: self.lifecycle,
            enabled: self.enabled,
            behavior: self.behavior,
        }
    }

    #[inline]
    pub fn behavior(&self) -> &dyn Component {
        &*self.behavior
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.behavior().as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        let behavior: &mut dyn Component = &mut *self.behavior;
        behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Run the callback belonging to `transition`.
    pub fn invoke(&mut self, transition: Transition, ctx: &UnitContext<'_>) -> UnitResult {
        let behavior: &mut dyn Component = &mut *self.behavior;
        match transition {
            Transition::Load => Ok(()),
            Transition::Attach => behavior.on_attach(ctx),
            Transition::Activate => behavior.on_activate(ctx),
            Transition::Start => behavior.on_start(ctx),
            Transition::Deactivate => behavior.on_deactivate(ctx),
            Transition::Detach => behavior.on_detach(ctx),
            Transition::Destroy => behavior.on_destroy(ctx),
        }
    }

    pub fn update(&mut self, ctx: &UnitContext<'_>, dt: f32) -> UnitResult {
        let behavior: &mut dyn Component = &mut *self.behavior;
        behavior.update(ctx, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Drawable {}

    struct Sprite;
    impl Component for Sprite {
        fn provides(&self, kind: &Kind) -> bool {
            kind.is::<dyn Drawable>()
        }
    }

    struct Logic;
    impl Component for Logic {}

    #[test]
    fn slot_records_concrete_type() {
        let slot = ComponentSlot::new(ComponentId::from_raw(1), Box::new(Sprite));
        assert_eq!(slot.type_id, TypeId::of::<Sprite>());
        assert!(slot.type_name.ends_with("Sprite"));
        assert!(slot.downcast_ref::<Sprite>().is_some());
        assert!(slot.downcast_ref::<Logic>().is_none());
    }

    #[test]
    fn exact_and_kind_queries_differ() {
        let sprite = ComponentSlot::new(ComponentId::from_raw(1), Box::new(Sprite));
        let logic = ComponentSlot::new(ComponentId::from_raw(2), Box::new(Logic));

        let drawable = ComponentQuery::kind::<dyn Drawable>();
        assert!(drawable.matches(&sprite));
        assert!(!drawable.matches(&logic));

        assert!(ComponentQuery::exact::<Logic>().matches(&logic));
        assert!(!ComponentQuery::exact::<Logic>().matches(&sprite));
        assert!(ComponentQuery::kind::<Sprite>().matches(&sprite));
    }
}
