// path.rs - Name validation and dotted path resolution
//
// A path is a `.`-separated list of child names, e.g. `Body.Arm.Hand`.
// `[self]` stays on the current node and `[parent]` moves up one level.
// Lookups start relative to the calling node; when that fails the node's
// registry gets a chance to resolve the path from its roots.

use crate::error::{HierarchyError, Result};
use crate::scene::{Entity, Hierarchy};

pub const PATH_SEPARATOR: char = '.';
pub const SELF_TOKEN: &str = "[self]";
pub const PARENT_TOKEN: &str = "[parent]";

const SEPARATOR_TOKEN: &str = ".";

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(HierarchyError::EmptyName);
    }
    for token in [SEPARATOR_TOKEN, SELF_TOKEN, PARENT_TOKEN] {
        if name.contains(token) {
            return Err(HierarchyError::ReservedName {
                name: name.to_string(),
                token,
            });
        }
    }
    Ok(())
}

impl Hierarchy {
    /// Resolve `path` from `from`, falling back to the registry.
    pub fn find(&self, from: Entity, path: &str) -> Result<Option<Entity>> {
        if let Some(found) = self.resolve_relative(from, path)? {
            return Ok(Some(found));
        }
        let Some(registry) = self.node(from)?.registry else {
            return Ok(None);
        };
        Ok(self.registries[registry.index()].resolve_path(path, self))
    }

    /// Resolve `path` from `from` without consulting the registry.
    pub fn resolve_relative(&self, from: Entity, path: &str) -> Result<Option<Entity>> {
        self.node(from)?;
        if path.is_empty() {
            return Ok(None);
        }
        let mut cursor = from;
        for segment in path.split(PATH_SEPARATOR) {
            let next = match segment {
                SELF_TOKEN => Some(cursor),
                PARENT_TOKEN => self.node(cursor)?.parent,
                "" => None,
                name => self.child_by_name(cursor, name)?,
            };
            match next {
                Some(entity) => cursor = entity,
                None => return Ok(None),
            }
        }
        Ok(Some(cursor))
    }

    /// Names from the topmost ancestor down to `entity`, joined with `.`.
    pub fn path_of(&self, entity: Entity) -> Result<String> {
        let mut names = Vec::new();
        let mut cursor = Some(entity);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        Ok(names.join(SEPARATOR_TOKEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneIndex;

    fn body() -> (Hierarchy, Entity, Entity, Entity) {
        let mut tree = Hierarchy::new();
        let root = tree.create(Some("Body")).unwrap();
        let arm = tree.create(Some("Arm")).unwrap();
        let hand = tree.create(Some("Hand")).unwrap();
        tree.add_child(root, arm).unwrap();
        tree.add_child(arm, hand).unwrap();
        (tree, root, arm, hand)
    }

    #[test]
    fn reserved_tokens_are_rejected() {
        assert!(validate_name("Arm").is_ok());
        assert!(matches!(validate_name(""), Err(HierarchyError::EmptyName)));
        assert!(matches!(
            validate_name("Left.Arm"),
            Err(HierarchyError::ReservedName { token: ".", .. })
        ));
        assert!(matches!(
            validate_name("my[self]"),
            Err(HierarchyError::ReservedName { token: SELF_TOKEN, .. })
        ));
    }

    #[test]
    fn relative_paths_walk_down_and_up() {
        let (tree, root, arm, hand) = body();
        assert_eq!(tree.find(root, "Arm.Hand").unwrap(), Some(hand));
        assert_eq!(tree.find(hand, "[parent]").unwrap(), Some(arm));
        assert_eq!(tree.find(hand, "[parent].[parent]").unwrap(), Some(root));
        assert_eq!(tree.find(arm, "[self].Hand").unwrap(), Some(hand));
        assert_eq!(tree.find(root, "[parent]").unwrap(), None);
        assert_eq!(tree.find(root, "Arm..Hand").unwrap(), None);
        assert_eq!(tree.find(root, "Leg").unwrap(), None);
    }

    #[test]
    fn registry_resolves_absolute_paths() {
        let (mut tree, root, _, hand) = body();
        let registry = tree.add_registry(SceneIndex::new());
        tree.register_root(registry, root).unwrap();

        assert_eq!(tree.resolve_relative(hand, "Body.Arm").unwrap(), None);
        assert_eq!(tree.find(hand, "Body.Arm.Hand").unwrap(), Some(hand));
    }

    #[test]
    fn path_of_joins_ancestor_names() {
        let (tree, _, _, hand) = body();
        assert_eq!(tree.path_of(hand).unwrap(), "Body.Arm.Hand");
    }

    #[test]
    fn find_scenario_from_root_and_child() {
        let mut tree = Hierarchy::new();
        let r = tree.create(Some("R")).unwrap();
        let a = tree.create(Some("A")).unwrap();
        let b = tree.create(Some("B")).unwrap();
        tree.add_child(r, a).unwrap();
        tree.add_child(a, b).unwrap();

        assert_eq!(tree.find(r, "A.B").unwrap(), Some(b));
        assert_eq!(tree.find(a, "[parent]").unwrap(), Some(r));
        assert!(tree.set_name(a, "A.x").is_err());
        assert_eq!(tree.name(a).unwrap(), "A");
    }
}
