// demo.rs - Sample scene and components for the runtime binary

use anyhow::Result;
use arbor_core::scene::{Component, Entity, Hierarchy, Kind, RegistryId, UnitContext};
use arbor_core::UnitResult;

/// Marker for components that draw something.
pub trait Renderable {}

/// Rotates its owner a little every tick.
#[derive(Debug, Default)]
pub struct Spin {
    pub degrees_per_second: f32,
    pub angle: f32,
}

impl Component for Spin {
    fn on_start(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        tracing::info!(owner = ctx.owner_name, "spin started");
        Ok(())
    }

    fn update(&mut self, _ctx: &UnitContext<'_>, dt: f32) -> UnitResult {
        self.angle = (self.angle + self.degrees_per_second * dt) % 360.0;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Sprite {
    pub image: String,
}

impl Component for Sprite {
    fn provides(&self, kind: &Kind) -> bool {
        kind.is::<dyn Renderable>()
    }

    fn on_activate(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        tracing::debug!(owner = ctx.owner_name, image = %self.image, "sprite visible");
        Ok(())
    }

    fn on_deactivate(&mut self, ctx: &UnitContext<'_>) -> UnitResult {
        tracing::debug!(owner = ctx.owner_name, image = %self.image, "sprite hidden");
        Ok(())
    }
}

/// Fails to start; the default capture policy logs it and moves on.
#[derive(Debug, Default)]
pub struct Flaky;

impl Component for Flaky {
    fn on_start(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        Err("flaky component refused to start".into())
    }
}

pub struct DemoScene {
    pub root: Entity,
    pub player: Entity,
}

/// World -> (Player [Spin, Sprite], Camera [Flaky])
pub fn build(tree: &mut Hierarchy, registry: RegistryId) -> Result<DemoScene> {
    let root = tree.create(Some("World"))?;
    let player = tree.create(Some("Player"))?;
    let camera = tree.create(Some("Camera"))?;

    tree.add_child(root, player)?;
    tree.add_child(root, camera)?;
    tree.set_tag(player, Some("player"))?;

    tree.add(
        player,
        Spin {
            degrees_per_second: 90.0,
            ..Spin::default()
        },
    )?;
    tree.add(
        player,
        Sprite {
            image: "player.png".to_string(),
        },
    )?;
    tree.add(camera, Flaky)?;

    tree.register_root(registry, root)?;
    Ok(DemoScene { root, player })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::scene::{ComponentQuery, SceneIndex, SearchOptions};
    use arbor_core::LifecycleState;

    #[test]
    fn demo_scene_runs_through_lifecycle() {
        let mut tree = Hierarchy::new();
        let registry = tree.add_registry(SceneIndex::new());
        let scene = build(&mut tree, registry).unwrap();

        tree.attach(scene.root).unwrap();
        tree.activate(scene.root).unwrap();
        tree.start(scene.root).unwrap();
        tree.update(scene.root, 0.5).unwrap();

        assert_eq!(tree.state(scene.player), LifecycleState::Started);
        let spin = tree.component::<Spin>(scene.player).unwrap().unwrap();
        assert_eq!(spin.angle, 45.0);

        let renderables = tree
            .find_components_in_children(
                scene.root,
                ComponentQuery::kind::<dyn Renderable>(),
                &SearchOptions::new(),
            )
            .unwrap();
        assert_eq!(renderables.len(), 1);

        let index = tree.registry::<SceneIndex>(registry).unwrap();
        assert_eq!(index.tagged("player"), &[scene.player]);
    }
}
