//! Scene registries
//!
//! A registry is the non-owning index above a set of root entities. The
//! hierarchy tells it about every entity entering or leaving a registered
//! tree, and consults it for paths that do not resolve relative to the
//! calling node.

use crate::scene::{AsAny, Entity, EntityId, Hierarchy, PATH_SEPARATOR};
use std::collections::HashMap;
use std::fmt;

/// Handle of a registry installed with [`Hierarchy::add_registry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RegistryId(u32);

impl RegistryId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry {}", self.0)
    }
}

/// Hooks a registry receives from the hierarchy.
pub trait SceneRegistry: AsAny {
    /// An entity joined a registered tree.
    fn register(&mut self, entity: Entity, id: EntityId, tag: Option<&str>);

    /// An entity left a registered tree.
    fn unregister(&mut self, entity: Entity, id: EntityId, tag: Option<&str>);

    fn tag_changed(&mut self, entity: Entity, old: Option<&str>, new: Option<&str>) {
        let _ = (entity, old, new);
    }

    /// A subtree was linked in; `parent` is `None` for a new root.
    fn entity_added(&mut self, entity: Entity, parent: Option<Entity>) {
        let _ = (entity, parent);
    }

    /// A subtree was unlinked; `parent` is `None` for a removed root.
    fn entity_detached(&mut self, entity: Entity, parent: Option<Entity>) {
        let _ = (entity, parent);
    }

    /// Resolve a path no relative lookup could satisfy.
    fn resolve_path(&self, path: &str, tree: &Hierarchy) -> Option<Entity> {
        let _ = (path, tree);
        None
    }
}

/// Default registry: roots in registration order, an id index and a tag index.
#[derive(Debug, Default)]
pub struct SceneIndex {
    roots: Vec<Entity>,
    ids: HashMap<EntityId, Entity>,
    tags: HashMap<String, Vec<Entity>>,
}

impl SceneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.ids.get(&id).copied()
    }

    /// Registered entities carrying `tag`, in registration order.
    pub fn tagged(&self, tag: &str) -> &[Entity] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn untag(&mut self, entity: Entity, tag: &str) {
        if let Some(entities) = self.tags.get_mut(tag) {
            entities.retain(|e| *e != entity);
            if entities.is_empty() {
                self.tags.remove(tag);
            }
        }
    }
}

impl SceneRegistry for SceneIndex {
    fn register(&mut self, entity: Entity, id: EntityId, tag: Option<&str>) {
        self.ids.insert(id, entity);
        if let Some(tag) = tag {
            self.tags.entry(tag.to_string()).or_default().push(entity);
        }
    }

    fn unregister(&mut self, entity: Entity, id: EntityId, tag: Option<&str>) {
        self.ids.remove(&id);
        if let Some(tag) = tag {
            self.untag(entity, tag);
        }
    }

    fn tag_changed(&mut self, entity: Entity, old: Option<&str>, new: Option<&str>) {
        if let Some(old) = old {
            self.untag(entity, old);
        }
        if let Some(new) = new {
            self.tags.entry(new.to_string()).or_default().push(entity);
        }
    }

    fn entity_added(&mut self, entity: Entity, parent: Option<Entity>) {
        if parent.is_none() {
            self.roots.push(entity);
        }
    }

    fn entity_detached(&mut self, entity: Entity, parent: Option<Entity>) {
        if parent.is_none() {
            self.roots.retain(|root| *root != entity);
        }
    }

    /// The first segment names a root, the rest resolves below it.
    fn resolve_path(&self, path: &str, tree: &Hierarchy) -> Option<Entity> {
        let (head, rest) = match path.split_once(PATH_SEPARATOR) {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let root = self
            .roots
            .iter()
            .copied()
            .find(|root| tree.name(*root).map(|name| name == head).unwrap_or(false))?;
        match rest {
            Some(rest) => tree.resolve_relative(root, rest).ok().flatten(),
            None => Some(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::testing::started_scene;

    #[test]
    fn index_tracks_subtrees_and_tags() {
        let (mut tree, registry, root) = started_scene();
        let child = tree.create(Some("Child")).unwrap();
        tree.set_tag(child, Some("enemy")).unwrap();
        tree.add_child(root, child).unwrap();
        let child_id = tree.id(child).unwrap();

        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert_eq!(index.roots(), &[root]);
        assert_eq!(index.entity(child_id), Some(child));
        assert_eq!(index.tagged("enemy"), &[child]);
        assert_eq!(index.len(), 2);

        tree.set_tag(child, Some("ally")).unwrap();
        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert!(index.tagged("enemy").is_empty());
        assert_eq!(index.tagged("ally"), &[child]);

        tree.destroy(child).unwrap();
        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert_eq!(index.entity(child_id), None);
        assert!(index.tagged("ally").is_empty());
    }

    #[test]
    fn unregistering_root_empties_index() {
        let (mut tree, registry, root) = started_scene();
        let child = tree.create(Some("Child")).unwrap();
        tree.add_child(root, child).unwrap();

        assert!(tree.unregister_root(root).unwrap());
        assert_eq!(tree.state(root), crate::LifecycleState::Detached);
        assert_eq!(tree.registry_of(child).unwrap(), None);
        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert!(index.is_empty());
        assert!(index.roots().is_empty());
        assert!(!tree.unregister_root(root).unwrap());
    }

    #[test]
    fn reassigned_id_is_reindexed() {
        let (mut tree, registry, root) = started_scene();
        let external = EntityId::from_raw(77);
        tree.set_entity_id(root, external).unwrap();
        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert_eq!(index.entity(external), Some(root));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn unknown_registry_is_rejected() {
        let mut tree = Hierarchy::new();
        let root = tree.create(None).unwrap();
        let missing = RegistryId::new(3);
        assert!(matches!(
            tree.register_root(missing, root),
            Err(crate::HierarchyError::UnknownRegistry(_))
        ));
        assert!(tree.registry::<SceneIndex>(missing).is_none());
    }
}
