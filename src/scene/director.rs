// Scene switching
//
// The director keeps exactly one live scene. When an Action asks for a scene
// change, the factory builds the next scene first; only once that succeeds is
// the old one torn down, so no Action, sequence or object survives the switch
// and a failed build leaves the current scene running.

use super::Scene;
use crate::engine::config::EngineConfig;
use crate::engine::error::SceneError;
use crate::engine::requests::HostRequest;

/// Builds scenes by number
pub trait SceneFactory {
    /// Construct and populate a scene, including its first Actions
    fn build(
        &self,
        scene: u32,
        previous: Option<u32>,
        config: &EngineConfig,
    ) -> Result<Scene, SceneError>;
}

/// Owns the current scene and switches scenes on request
pub struct Director<F: SceneFactory> {
    factory: F,
    config: EngineConfig,
    scene: Scene,
    previous: Option<u32>,
    /// Host requests collected from every scene, oldest first
    outbox: Vec<HostRequest>,
    changes: u32,
}

impl<F: SceneFactory> Director<F> {
    /// Build the first scene
    pub fn new(factory: F, config: EngineConfig, first: u32) -> Result<Self, SceneError> {
        let scene = factory.build(first, None, &config)?;
        Ok(Self {
            factory,
            config,
            scene,
            previous: None,
            outbox: Vec::new(),
            changes: 0,
        })
    }

    /// Tick the current scene, then apply any scene change it requested
    pub fn tick(&mut self) -> Result<(), SceneError> {
        self.scene.tick();
        self.outbox.extend(self.scene.drain_requests());

        if let Some(next) = self.scene.take_scene_change() {
            self.change_scene(next)?;
        }
        Ok(())
    }

    /// Build `next`, then tear the current scene down and switch to it
    ///
    /// If the build fails the current scene stays live.
    pub fn change_scene(&mut self, next: u32) -> Result<(), SceneError> {
        let current = self.scene.id();
        log::info!("Scene {} -> {}", current, next);

        let built = self.factory.build(next, Some(current), &self.config)?;
        let mut old = std::mem::replace(&mut self.scene, built);
        old.teardown();
        self.previous = Some(current);
        self.changes += 1;
        Ok(())
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn previous_scene(&self) -> Option<u32> {
        self.previous
    }

    /// Number of scene switches so far
    pub fn scene_changes(&self) -> u32 {
        self.changes
    }

    /// Hand collected host requests to the caller
    pub fn drain_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.outbox)
    }
}
