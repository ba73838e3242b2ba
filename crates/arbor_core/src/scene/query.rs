// query.rs - Component and child lookups

use crate::error::Result;
use crate::scene::{ComponentId, ComponentQuery, Entity, EntityId, Hierarchy};
use std::collections::VecDeque;

/// Filters for searches spanning several entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions<'a> {
    /// Only consider entities carrying this tag.
    pub tag: Option<&'a str>,
    /// Leave out the entity the search starts from.
    pub skip_owner: bool,
}

impl<'a> SearchOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn skip_owner(mut self) -> Self {
        self.skip_owner = true;
        self
    }
}

impl Hierarchy {
    // ── Components on one entity ──────────────────────────────────────

    pub fn find_component(&self, entity: Entity, query: ComponentQuery) -> Result<Option<ComponentId>> {
        Ok(self
            .node(entity)?
            .units
            .iter()
            .find(|unit| query.matches(unit))
            .map(|unit| unit.id))
    }

    pub fn find_components(&self, entity: Entity, query: ComponentQuery) -> Result<Vec<ComponentId>> {
        Ok(self
            .node(entity)?
            .units
            .iter()
            .filter(|unit| query.matches(unit))
            .map(|unit| unit.id)
            .collect())
    }

    fn collect_matches(
        &self,
        entity: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
        out: &mut Vec<(Entity, ComponentId)>,
    ) -> Result<()> {
        let node = self.node(entity)?;
        if options.tag.is_some() && node.tag.as_deref() != options.tag {
            return Ok(());
        }
        out.extend(
            node.units
                .iter()
                .filter(|unit| query.matches(unit))
                .map(|unit| (entity, unit.id)),
        );
        Ok(())
    }

    // ── Components across the tree ────────────────────────────────────

    /// Matching components on `entity` and its descendants, breadth-first.
    pub fn find_components_in_children(
        &self,
        entity: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
    ) -> Result<Vec<(Entity, ComponentId)>> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([entity]);
        while let Some(current) = queue.pop_front() {
            if !(options.skip_owner && current == entity) {
                self.collect_matches(current, query, options, &mut found)?;
            }
            queue.extend(self.node(current)?.children.iter().copied());
        }
        Ok(found)
    }

    pub fn find_component_in_children(
        &self,
        entity: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
    ) -> Result<Option<(Entity, ComponentId)>> {
        let mut queue = VecDeque::from([entity]);
        let mut found = Vec::new();
        while let Some(current) = queue.pop_front() {
            if !(options.skip_owner && current == entity) {
                self.collect_matches(current, query, options, &mut found)?;
                if let Some(first) = found.first() {
                    return Ok(Some(*first));
                }
            }
            queue.extend(self.node(current)?.children.iter().copied());
        }
        Ok(None)
    }

    /// Matching components on `entity` and its ancestors, nearest first.
    pub fn find_components_in_parents(
        &self,
        entity: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
    ) -> Result<Vec<(Entity, ComponentId)>> {
        let mut found = Vec::new();
        let mut cursor = if options.skip_owner {
            self.node(entity)?.parent
        } else {
            Some(entity)
        };
        while let Some(current) = cursor {
            self.collect_matches(current, query, options, &mut found)?;
            cursor = self.node(current)?.parent;
        }
        Ok(found)
    }

    pub fn find_component_in_parents(
        &self,
        entity: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
    ) -> Result<Option<(Entity, ComponentId)>> {
        Ok(self
            .find_components_in_parents(entity, query, options)?
            .into_iter()
            .next())
    }

    // ── Children ──────────────────────────────────────────────────────

    /// Direct child by id.
    pub fn child_by_id(&self, parent: Entity, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.node(parent)?.child_ids.get(&id).copied())
    }

    /// Direct child by name.
    pub fn child_by_name(&self, parent: Entity, name: &str) -> Result<Option<Entity>> {
        let parent = self.node(parent)?;
        for child in &parent.children {
            if self.node(*child)?.name == name {
                return Ok(Some(*child));
            }
        }
        Ok(None)
    }

    /// Child by name; with `recursive`, the shallowest match in the subtree.
    pub fn find_child(&self, parent: Entity, name: &str, recursive: bool) -> Result<Option<Entity>> {
        if !recursive {
            return self.child_by_name(parent, name);
        }
        let mut queue: VecDeque<Entity> = self.node(parent)?.children.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            let node = self.node(current)?;
            if node.name == name {
                return Ok(Some(current));
            }
            queue.extend(node.children.iter().copied());
        }
        Ok(None)
    }

    /// Children (or, with `recursive`, descendants) carrying `tag`.
    pub fn find_children_with_tag(
        &self,
        parent: Entity,
        tag: &str,
        recursive: bool,
    ) -> Result<Vec<Entity>> {
        let mut found = Vec::new();
        let mut queue: VecDeque<Entity> = self.node(parent)?.children.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            let node = self.node(current)?;
            if node.tag.as_deref() == Some(tag) {
                found.push(current);
            }
            if recursive {
                queue.extend(node.children.iter().copied());
            }
        }
        Ok(found)
    }

    /// First descendant (breadth-first) with a component matching `query`.
    pub fn find_child_with_component(
        &self,
        parent: Entity,
        query: ComponentQuery,
        options: &SearchOptions<'_>,
    ) -> Result<Option<Entity>> {
        let options = SearchOptions {
            skip_owner: true,
            ..*options
        };
        Ok(self
            .find_component_in_children(parent, query, &options)?
            .map(|(entity, _)| entity))
    }

    /// Every descendant of `entity` in pre-order, excluding `entity`.
    pub fn descendants(&self, entity: Entity) -> Result<Vec<Entity>> {
        let mut out = Vec::new();
        let mut stack: Vec<Entity> = self.node(entity)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current)?.children.iter().rev());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Component, Kind};

    trait Interactable {}

    struct Door;
    impl Component for Door {
        fn provides(&self, kind: &Kind) -> bool {
            kind.is::<dyn Interactable>()
        }
    }

    struct Lever;
    impl Component for Lever {
        fn provides(&self, kind: &Kind) -> bool {
            kind.is::<dyn Interactable>()
        }
    }

    struct Health;
    impl Component for Health {}

    /// House -> (Hall -> (Door), Cellar -> (Lever)), House has Health.
    fn house() -> (Hierarchy, [Entity; 4]) {
        let mut tree = Hierarchy::new();
        let house = tree.create(Some("House")).unwrap();
        let hall = tree.create(Some("Hall")).unwrap();
        let cellar = tree.create(Some("Cellar")).unwrap();
        let door = tree.create(Some("Door")).unwrap();
        tree.add_child(house, hall).unwrap();
        tree.add_child(house, cellar).unwrap();
        tree.add_child(hall, door).unwrap();
        tree.add(house, Health).unwrap();
        tree.add(door, Door).unwrap();
        tree.add(cellar, Lever).unwrap();
        tree.set_tag(cellar, Some("dark")).unwrap();
        (tree, [house, hall, cellar, door])
    }

    #[test]
    fn kind_queries_search_breadth_first() {
        let (tree, [house, _, cellar, door]) = house();
        let found = tree
            .find_components_in_children(
                house,
                ComponentQuery::kind::<dyn Interactable>(),
                &SearchOptions::new(),
            )
            .unwrap();
        let owners: Vec<Entity> = found.iter().map(|(entity, _)| *entity).collect();
        assert_eq!(owners, vec![cellar, door]);

        let exact = tree
            .find_components_in_children(house, ComponentQuery::exact::<Door>(), &SearchOptions::new())
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].0, door);
    }

    #[test]
    fn tag_filter_and_skip_owner_narrow_search() {
        let (tree, [house, _, cellar, _]) = house();
        let tagged = tree
            .find_components_in_children(
                house,
                ComponentQuery::kind::<dyn Interactable>(),
                &SearchOptions::new().with_tag("dark"),
            )
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].0, cellar);

        let health = ComponentQuery::exact::<Health>();
        assert!(tree
            .find_component_in_children(house, health, &SearchOptions::new().skip_owner())
            .unwrap()
            .is_none());
        assert!(tree
            .find_component_in_children(house, health, &SearchOptions::new())
            .unwrap()
            .is_some());
    }

    #[test]
    fn parent_search_walks_up_to_root() {
        let (tree, [house, _, _, door]) = house();
        let found = tree
            .find_component_in_parents(door, ComponentQuery::exact::<Health>(), &SearchOptions::new())
            .unwrap();
        assert_eq!(found.map(|(entity, _)| entity), Some(house));

        let own = tree
            .find_component_in_parents(
                door,
                ComponentQuery::exact::<Door>(),
                &SearchOptions::new().skip_owner(),
            )
            .unwrap();
        assert!(own.is_none());
    }

    #[test]
    fn child_lookups_by_name_and_tag() {
        let (tree, [house, hall, cellar, door]) = house();
        assert_eq!(tree.find_child(house, "Door", false).unwrap(), None);
        assert_eq!(tree.find_child(house, "Door", true).unwrap(), Some(door));
        assert_eq!(tree.find_child(house, "Hall", false).unwrap(), Some(hall));
        assert_eq!(tree.find_children_with_tag(house, "dark", false).unwrap(), vec![cellar]);
        assert_eq!(
            tree.find_child_with_component(house, ComponentQuery::exact::<Door>(), &SearchOptions::new())
                .unwrap(),
            Some(door)
        );
        assert_eq!(tree.descendants(house).unwrap(), vec![hall, door, cellar]);
    }
}
