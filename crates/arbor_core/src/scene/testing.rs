// testing.rs - Shared fixtures for scene tests

use crate::error::UnitResult;
use crate::scene::{
    Component, Entity, Hierarchy, RegistryId, SceneIndex, UnitContext, UnitPhase,
};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) type Journal = Rc<RefCell<Vec<String>>>;

pub(crate) fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

/// Records every callback as `label:phase`, optionally failing one phase.
pub(crate) struct Probe {
    label: &'static str,
    journal: Journal,
    fail_on: Option<UnitPhase>,
}

impl Probe {
    pub fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: Rc::clone(journal),
            fail_on: None,
        }
    }

    pub fn failing(label: &'static str, journal: &Journal, phase: UnitPhase) -> Self {
        Self {
            fail_on: Some(phase),
            ..Self::new(label, journal)
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn record(&mut self, phase: UnitPhase) -> UnitResult {
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.label, phase));
        if self.fail_on == Some(phase) {
            return Err(format!("{} failed during {}", self.label, phase).into());
        }
        Ok(())
    }
}

impl Component for Probe {
    fn allows_multiple(&self) -> bool {
        true
    }

    fn on_attach(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Attach)
    }

    fn on_activate(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Activate)
    }

    fn on_start(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Start)
    }

    fn on_deactivate(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Deactivate)
    }

    fn on_detach(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Detach)
    }

    fn on_destroy(&mut self, _ctx: &UnitContext<'_>) -> UnitResult {
        self.record(UnitPhase::Destroy)
    }

    fn update(&mut self, _ctx: &UnitContext<'_>, _dt: f32) -> UnitResult {
        self.record(UnitPhase::Update)
    }
}

/// A registered root named "Root", already started.
pub(crate) fn started_scene() -> (Hierarchy, RegistryId, Entity) {
    let mut tree = Hierarchy::new();
    let registry = tree.add_registry(SceneIndex::new());
    let root = tree.create(Some("Root")).unwrap();
    tree.register_root(registry, root).unwrap();
    tree.attach(root).unwrap();
    tree.activate(root).unwrap();
    tree.start(root).unwrap();
    (tree, registry, root)
}
