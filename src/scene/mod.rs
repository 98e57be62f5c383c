// Scene runtime: objects, Actions, sequences and the per-tick driver

pub mod animation;
pub mod director;
pub mod mover;
pub mod object;
pub mod palette;
mod shell;
pub mod walk;

use std::collections::BTreeSet;
use std::sync::Arc;

pub use animation::{AnimMode, Animator};
pub use director::{Director, SceneFactory};
pub use mover::Mover;
pub use object::{ObjectEvents, ObjectSet, SceneObject};
pub use palette::{Palette, PaletteRotation, PALETTE_SIZE};
pub use walk::WalkRegions;

use crate::engine::config::EngineConfig;
use crate::engine::error::{SceneError, SnapshotError};
use crate::engine::ids::{ActionId, ObjectId};
use crate::engine::requests::{HostRequest, RequestQueue};
use crate::script::action::ActionScript;
use crate::script::registry::ScriptRegistry;
use crate::script::scheduler::{Action, ActionScheduler, WaitOn};
use crate::script::sequence::{SequenceManager, SequenceTable};
use crate::script::snapshot::{self, SceneSnapshot};
use shell::{start_bound, EffectShell};

/// Scene-scoped collaborators that Actions act upon
#[derive(Debug)]
pub struct Stage {
    pub objects: ObjectSet,
    pub walk: WalkRegions,
    pub palette: Palette,
    pub requests: RequestQueue,
    /// Sounds the host reports as still playing
    pub(crate) playing_sounds: BTreeSet<u32>,
    pub(crate) pending_change: Option<u32>,
}

impl Stage {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        Self {
            objects: ObjectSet::new(),
            walk: WalkRegions::new(),
            palette: Palette::new(),
            requests: RequestQueue::new(config.request_queue_capacity, config.strict),
            playing_sounds: BTreeSet::new(),
            pending_change: None,
        }
    }
}

/// One loaded scene
///
/// Owns the scheduler arena, so tearing the scene down invalidates every
/// Action it holds in one step.
#[derive(Debug)]
pub struct Scene {
    id: u32,
    config: EngineConfig,
    stage: Stage,
    scheduler: ActionScheduler,
    sequences: SequenceManager,
    table: Arc<SequenceTable>,
    torn_down: bool,
}

impl Scene {
    pub fn new(id: u32, config: EngineConfig, table: Arc<SequenceTable>) -> Self {
        log::info!("Loading scene {}", id);
        Self {
            id,
            stage: Stage::new(&config),
            scheduler: ActionScheduler::new(config.max_reentries_per_tick),
            sequences: SequenceManager::new(),
            table,
            config,
            torn_down: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn objects(&self) -> &ObjectSet {
        &self.stage.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectSet {
        &mut self.stage.objects
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.stage.objects.by_name(name)
    }

    pub fn add_object(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        self.stage.objects.insert(object)
    }

    pub fn palette(&self) -> &Palette {
        &self.stage.palette
    }

    pub fn requests_mut(&mut self) -> &mut RequestQueue {
        &mut self.stage.requests
    }

    pub fn scheduler(&self) -> &ActionScheduler {
        &self.scheduler
    }

    pub fn sequences(&self) -> &SequenceManager {
        &self.sequences
    }

    /// Number of the most recent tick
    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Start an Action on a named object, replacing its current one
    ///
    /// This is how input handling hands control to a script. The Action
    /// runs its first step on the next tick.
    pub fn start_action(
        &mut self,
        object: &str,
        script: Box<dyn ActionScript>,
    ) -> Result<ActionId, SceneError> {
        let owner = self
            .stage
            .objects
            .id(object)
            .ok_or_else(|| SceneError::UnknownObject(object.to_string()))?;
        Ok(start_bound(
            &mut self.scheduler,
            &mut self.stage.objects,
            Some(owner),
            Action::new(script, Some(owner)),
        ))
    }

    /// Start an Action bound to the scene itself rather than an object
    pub fn start_scene_action(&mut self, script: Box<dyn ActionScript>) -> ActionId {
        self.scheduler.register(Action::new(script, None))
    }

    /// Wake the Action bound to a named object from outside the scheduler
    pub fn signal(&mut self, object: &str) -> Result<(), SceneError> {
        let action = self
            .stage
            .objects
            .by_name(object)
            .ok_or_else(|| SceneError::UnknownObject(object.to_string()))?
            .action();
        if let Some(action) = action {
            self.scheduler.signal(action);
        }
        Ok(())
    }

    /// Report a sound as playing or stopped (host callback)
    pub fn set_sound_playing(&mut self, sound: u32, playing: bool) {
        if playing {
            self.stage.playing_sounds.insert(sound);
        } else {
            self.stage.playing_sounds.remove(&sound);
        }
    }

    /// Advance the scene one tick
    ///
    /// Actions run first and their effects apply immediately; then movers
    /// and animators step, then sequences, then palette rotations. A
    /// sequence's `MoveTo` therefore takes its first step on the next tick.
    pub fn tick(&mut self) {
        if self.torn_down {
            return;
        }

        let mut shell = EffectShell {
            stage: &mut self.stage,
            sequences: &mut self.sequences,
            table: self.table.as_ref(),
            config: &self.config,
        };
        self.scheduler.tick(|scheduler, id| shell.advance(scheduler, id));

        let events = self
            .stage
            .objects
            .tick(&self.stage.walk, self.config.default_frame_delay);
        for object in events.arrived {
            self.scheduler.notify(WaitOn::Motion(object));
        }
        for object in events.animation_ended {
            self.scheduler.notify(WaitOn::Animation(object));
        }

        let finished = self
            .sequences
            .tick(&mut self.stage.objects, self.config.default_move_step);
        for (sequence, _) in finished {
            self.scheduler.notify(WaitOn::Sequence(sequence));
        }

        self.stage.palette.tick();
    }

    /// Take the scene change requested by an Action, if any
    pub fn take_scene_change(&mut self) -> Option<u32> {
        self.stage.pending_change.take()
    }

    /// Hand queued host requests to the caller
    pub fn drain_requests(&mut self) -> Vec<HostRequest> {
        self.stage.requests.drain()
    }

    /// Save objects, Actions, sequence runs and palette state
    pub fn snapshot(&self) -> SceneSnapshot {
        snapshot::capture(self.id, &self.scheduler, &self.sequences, &self.stage)
    }

    /// Resume the scene from a save
    ///
    /// Objects must already exist (the scene is rebuilt by its factory); the
    /// save then overwrites their state. On error the scene is unchanged.
    pub fn restore(
        &mut self,
        saved: &SceneSnapshot,
        registry: &ScriptRegistry,
    ) -> Result<(), SnapshotError> {
        if saved.scene != self.id {
            return Err(SnapshotError::SceneMismatch {
                saved: saved.scene,
                current: self.id,
            });
        }

        let restored = snapshot::restore(
            saved,
            &mut self.stage,
            registry,
            self.table.as_ref(),
            self.config.max_reentries_per_tick,
        )?;
        self.scheduler = restored.scheduler;
        self.sequences = restored.sequences;
        Ok(())
    }

    /// Drop everything the scene owns
    ///
    /// Afterwards nothing is left to tick, and no id handed out by this
    /// scene resolves any more.
    pub fn teardown(&mut self) {
        log::info!(
            "Tearing down scene {} ({} actions, {} sequences)",
            self.id,
            self.scheduler.len(),
            self.sequences.len()
        );
        self.scheduler.clear();
        self.sequences.clear();
        self.stage.objects.clear();
        self.stage.palette.clear_rotations();
        self.stage.requests.clear();
        self.stage.playing_sounds.clear();
        self.torn_down = true;
    }
}
