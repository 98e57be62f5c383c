// Save and restore of a running scene
//
// A save records every object's state (including an unfinished Mover or
// animation), every live Action, every running sequence, the palette
// rotations and the switched-off walk regions. Objects are saved by name,
// children and sequence runs by their index in the save, so a restored
// scene can hand out fresh ids. Restoring into a freshly built scene resumes
// exactly where the save left off without re-running any step.

use std::collections::{HashMap, HashSet};

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::action::Locals;
use super::registry::ScriptRegistry;
use super::scheduler::{Action, ActionScheduler, WaitOn};
use super::sequence::{SequenceManager, SequenceSnapshot, SequenceTable};
use crate::engine::error::SnapshotError;
use crate::engine::ids::{ActionId, ObjectId, SequenceId};
use crate::scene::animation::Animator;
use crate::scene::mover::Mover;
use crate::scene::object::{ObjectSet, SceneObject};
use crate::scene::palette::PaletteRotation;
use crate::scene::Stage;

/// What a saved Action was suspended on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavedWait {
    /// Index of the child within the same save
    Child(usize),
    Motion(String),
    Animation(String),
    /// Index of the sequence run within the same save
    Sequence(usize),
    Signal,
}

/// One saved Action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    pub kind: String,
    /// Name of the owning object, `None` for scene-level Actions
    pub owner: Option<String>,
    pub step: u32,
    pub delay: u32,
    pub waiting: Option<SavedWait>,
    #[serde(default)]
    pub signal_latched: bool,
    #[serde(default)]
    pub locals: Locals,
}

/// Saved state of one scene object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub name: String,
    pub position: IVec2,
    pub visage: u32,
    pub strip: u16,
    pub frame: u16,
    pub frame_count: u16,
    pub frame_delay: Option<u32>,
    pub zoom: u16,
    pub priority: Option<i32>,
    pub visible: bool,
    pub move_step: Option<IVec2>,
    /// Unfinished movement, re-armed on restore
    pub mover: Option<Mover>,
    pub animator: Animator,
}

impl ObjectSnapshot {
    fn capture(object: &SceneObject) -> Self {
        Self {
            name: object.name.clone(),
            position: object.position,
            visage: object.visage,
            strip: object.strip,
            frame: object.frame,
            frame_count: object.frame_count,
            frame_delay: object.frame_delay,
            zoom: object.zoom,
            priority: object.priority,
            visible: object.visible,
            move_step: object.move_step,
            mover: object.mover.clone(),
            animator: object.animator.clone(),
        }
    }

    fn apply(&self, object: &mut SceneObject) {
        object.position = self.position;
        object.visage = self.visage;
        object.strip = self.strip;
        object.frame = self.frame;
        object.frame_count = self.frame_count;
        object.frame_delay = self.frame_delay;
        object.zoom = self.zoom;
        object.priority = self.priority;
        object.visible = self.visible;
        object.move_step = self.move_step;
        object.mover = self.mover.clone();
        object.animator = self.animator.clone();
        object.action = None;
    }
}

/// Everything needed to resume a scene mid-cutscene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub scene: u32,
    pub tick: u64,
    /// Every object present at save time, in insertion order
    pub objects: Vec<ObjectSnapshot>,
    /// Live Actions in registration order
    pub actions: Vec<ActionSnapshot>,
    /// Running sequences in start order
    pub sequences: Vec<SequenceSnapshot>,
    #[serde(default)]
    pub rotations: Vec<PaletteRotation>,
    #[serde(default)]
    pub disabled_regions: Vec<u32>,
}

impl SceneSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Record the full runtime state of a scene
pub fn capture(
    scene: u32,
    scheduler: &ActionScheduler,
    sequences: &SequenceManager,
    stage: &Stage,
) -> SceneSnapshot {
    let objects = &stage.objects;
    let action_index: HashMap<ActionId, usize> = scheduler
        .iter()
        .enumerate()
        .map(|(position, (id, _))| (id, position))
        .collect();
    let runs = sequences.save(objects, &action_index);
    let run_index: HashMap<SequenceId, usize> = runs
        .iter()
        .enumerate()
        .map(|(position, (id, _))| (*id, position))
        .collect();
    let name_of = |id: ObjectId| objects.get(id).map(|object| object.name.clone());

    let actions = scheduler
        .iter()
        .map(|(_, action)| {
            let waiting = action.waiting().and_then(|wait| match wait {
                WaitOn::Child(child) => action_index.get(&child).copied().map(SavedWait::Child),
                WaitOn::Motion(object) => name_of(object).map(SavedWait::Motion),
                WaitOn::Animation(object) => name_of(object).map(SavedWait::Animation),
                WaitOn::Sequence(run) => run_index.get(&run).copied().map(SavedWait::Sequence),
                WaitOn::Signal => Some(SavedWait::Signal),
            });
            if action.waiting().is_some() && waiting.is_none() {
                log::warn!(
                    "{} waits on something no longer in the scene, saving as ready",
                    action.kind()
                );
            }

            ActionSnapshot {
                kind: action.kind().to_string(),
                owner: action.owner().and_then(name_of),
                step: action.step(),
                delay: action.delay(),
                waiting,
                signal_latched: action.signal_latched(),
                locals: action.locals(),
            }
        })
        .collect();

    SceneSnapshot {
        scene,
        tick: scheduler.current_tick(),
        objects: objects.iter().map(|(_, object)| ObjectSnapshot::capture(object)).collect(),
        actions,
        sequences: runs.into_iter().map(|(_, run)| run).collect(),
        rotations: stage.palette.rotations().to_vec(),
        disabled_regions: stage.walk.disabled().collect(),
    }
}

/// Runtime rebuilt from a save, ready to replace the scene's own
#[derive(Debug)]
pub struct Restored {
    pub scheduler: ActionScheduler,
    pub sequences: SequenceManager,
}

/// Rebuild a saved scene state on top of freshly built scene objects
///
/// Everything is validated before the stage is touched, so a bad save
/// leaves the scene as it was. Objects missing from the save were removed
/// before it was taken and are removed again. Waits on movement, animation
/// and sequences are re-armed against the restored objects and runs.
pub fn restore(
    saved: &SceneSnapshot,
    stage: &mut Stage,
    registry: &ScriptRegistry,
    table: &SequenceTable,
    max_reentries: u32,
) -> Result<Restored, SnapshotError> {
    let object_id = |name: &String| {
        stage
            .objects
            .id(name)
            .ok_or_else(|| SnapshotError::UnknownObject(name.clone()))
    };
    for object in &saved.objects {
        object_id(&object.name)?;
    }

    let mut prepared = Vec::with_capacity(saved.actions.len());
    for (entry, snapshot) in saved.actions.iter().enumerate() {
        let script = registry.create(&snapshot.kind)?;
        let owner = snapshot.owner.as_ref().map(object_id).transpose()?;
        match &snapshot.waiting {
            Some(SavedWait::Child(child)) if *child >= saved.actions.len() || *child == entry => {
                return Err(SnapshotError::DanglingChild { entry, child: *child });
            }
            Some(SavedWait::Sequence(run)) if *run >= saved.sequences.len() => {
                return Err(SnapshotError::DanglingSequence { entry, run: *run });
            }
            Some(SavedWait::Motion(name) | SavedWait::Animation(name)) => {
                object_id(name)?;
            }
            _ => {}
        }
        prepared.push((script, owner));
    }
    for (run, sequence) in saved.sequences.iter().enumerate() {
        if let Some(owner) = sequence.owner.filter(|owner| *owner >= saved.actions.len()) {
            return Err(SnapshotError::DanglingOwner { run, owner });
        }
    }

    let mut scheduler = ActionScheduler::new(max_reentries);
    scheduler.set_current_tick(saved.tick);
    let actions: Vec<ActionId> = prepared
        .into_iter()
        .zip(&saved.actions)
        .map(|((script, owner), snapshot)| {
            scheduler.register(Action::restored(
                script,
                owner,
                snapshot.step,
                snapshot.delay,
                snapshot.locals,
                snapshot.signal_latched,
            ))
        })
        .collect();

    let mut sequences = SequenceManager::new();
    let runs = saved
        .sequences
        .iter()
        .map(|run| {
            let owner = run.owner.map(|owner| actions[owner]);
            sequences.restore_run(table, run, owner, &stage.objects)
        })
        .collect::<Result<Vec<SequenceId>, SnapshotError>>()?;

    // Validation is over; from here on the stage is rewritten
    apply_objects(&mut stage.objects, &saved.objects);
    stage.palette.clear_rotations();
    for rotation in &saved.rotations {
        stage.palette.add_rotation(rotation.clone());
    }
    stage.walk.set_disabled(saved.disabled_regions.iter().copied());

    for (id, snapshot) in actions.iter().zip(&saved.actions) {
        let wait = match &snapshot.waiting {
            Some(SavedWait::Child(child)) => Some(WaitOn::Child(actions[*child])),
            Some(SavedWait::Sequence(run)) => Some(WaitOn::Sequence(runs[*run])),
            Some(SavedWait::Signal) => Some(WaitOn::Signal),
            Some(SavedWait::Motion(name)) => stage
                .objects
                .id(name)
                .filter(|object| stage.objects.get(*object).is_some_and(SceneObject::is_moving))
                .map(WaitOn::Motion),
            Some(SavedWait::Animation(name)) => stage
                .objects
                .id(name)
                .filter(|object| {
                    stage
                        .objects
                        .get(*object)
                        .is_some_and(SceneObject::is_animating)
                })
                .map(WaitOn::Animation),
            None => None,
        };
        if snapshot.waiting.is_some() && wait.is_none() {
            log::debug!(
                "{} restored as ready (was waiting on {:?})",
                snapshot.kind,
                snapshot.waiting
            );
        }
        scheduler.set_waiting(*id, wait);

        let owner = scheduler.get(*id).and_then(Action::owner);
        if let Some(object) = owner.and_then(|owner| stage.objects.get_mut(owner)) {
            object.action = Some(*id);
        }
    }

    log::info!(
        "Restored {} actions and {} sequences at tick {}",
        actions.len(),
        runs.len(),
        saved.tick
    );
    Ok(Restored {
        scheduler,
        sequences,
    })
}

/// Apply saved object state and drop objects removed before the save
fn apply_objects(objects: &mut ObjectSet, saved: &[ObjectSnapshot]) {
    let kept: HashSet<&str> = saved.iter().map(|object| object.name.as_str()).collect();
    let removed: Vec<ObjectId> = objects
        .iter()
        .filter(|(_, object)| !kept.contains(object.name.as_str()))
        .map(|(id, _)| id)
        .collect();
    for id in removed {
        if let Some(object) = objects.remove(id) {
            log::debug!("{} was removed before the save, removing it again", object.name);
        }
    }

    for snapshot in saved {
        let Some(id) = objects.id(&snapshot.name) else {
            continue;
        };
        if let Some(object) = objects.get_mut(id) {
            snapshot.apply(object);
        }
    }
}
