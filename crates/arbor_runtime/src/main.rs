//! Arbor Runtime
//!
//! Small binary that builds a demo scene, drives it through its lifecycle
//! and tears it down again. Pass a settings JSON file as the first argument
//! to override the hierarchy defaults.

mod demo;

use anyhow::{Context, Result};
use arbor_core::scene::{Hierarchy, SceneIndex};
use arbor_core::HierarchySettings;
use std::path::Path;

fn load_settings(path: Option<&str>) -> Result<HierarchySettings> {
    let Some(path) = path else {
        return Ok(HierarchySettings::default());
    };
    let json = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("reading settings from {path}"))?;
    HierarchySettings::from_json_str(&json).with_context(|| format!("parsing settings in {path}"))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Arbor v{}", arbor_core::VERSION);

    let args: Vec<String> = std::env::args().collect();
    let settings = load_settings(args.get(1).map(String::as_str))?;
    tracing::info!(?settings, "hierarchy settings");

    let mut tree = Hierarchy::with_settings(settings);
    let registry = tree.add_registry(SceneIndex::new());
    let scene = demo::build(&mut tree, registry)?;

    tree.attach(scene.root)?;
    tree.activate(scene.root)?;
    tree.start(scene.root)?;
    tracing::info!("scene started");

    for frame in 0..3 {
        tree.update(scene.root, 1.0 / 60.0)?;
        tracing::info!(frame, "frame updated");
    }

    for entity in tree.descendants(scene.root)? {
        tracing::info!(path = %tree.path_of(entity)?, state = %tree.state(entity), "node");
    }
    if let Some(camera) = tree.find(scene.player, "[parent].Camera")? {
        tracing::info!(camera = %tree.path_of(camera)?, "camera resolved from player");
    }

    tree.set_enabled(scene.player, false)?;
    tracing::info!(state = %tree.state(scene.player), "player disabled");
    tree.set_enabled(scene.player, true)?;

    tree.destroy(scene.root)?;
    tracing::info!(remaining = tree.len(), "scene destroyed");

    for key in [
        "transitions.attach",
        "transitions.start",
        "transitions.destroy",
        "units.captured",
    ] {
        tracing::info!(counter = key, value = tree.counters().get(key), "metrics");
    }
    tracing::info!(
        sweeps = tree.profiler().sweep_count("update"),
        elapsed = ?tree.profiler().get_timing("update"),
        "update timing"
    );

    Ok(())
}
