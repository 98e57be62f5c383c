// Scene objects and the per-scene object set

use std::collections::HashMap;

use glam::IVec2;
use slotmap::SlotMap;

use super::animation::{AnimMode, Animator};
use super::mover::Mover;
use crate::engine::error::SceneError;
use crate::engine::ids::{ActionId, ObjectId};

/// A visual entity placed in a scene
///
/// Holds at most one Action reference at a time, as a plain id: the object
/// never owns the Action.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Unique name within the scene (used by scripts and snapshots)
    pub name: String,
    pub position: IVec2,
    /// Sprite resource identifier
    pub visage: u32,
    /// Strip (row) within the visage
    pub strip: u16,
    /// Current 1-based frame within the strip
    pub frame: u16,
    /// Number of frames in the current strip
    pub frame_count: u16,
    /// Ticks between frame changes; `None` uses the engine default
    pub frame_delay: Option<u32>,
    /// Scale in percent
    pub zoom: u16,
    /// Fixed draw priority; `None` sorts by position
    pub priority: Option<i32>,
    pub visible: bool,
    /// Per-axis Mover step; `None` uses the engine default
    pub move_step: Option<IVec2>,
    pub(crate) action: Option<ActionId>,
    pub(crate) mover: Option<Mover>,
    pub(crate) animator: Animator,
}

impl SceneObject {
    /// Create a visible object at the origin showing frame 1
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            position: IVec2::ZERO,
            visage: 0,
            strip: 1,
            frame: 1,
            frame_count: 1,
            frame_delay: None,
            zoom: 100,
            priority: None,
            visible: true,
            move_step: None,
            action: None,
            mover: None,
            animator: Animator::new(),
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = IVec2::new(x, y);
        self
    }

    pub fn with_visage(mut self, visage: u32) -> Self {
        self.visage = visage;
        self
    }

    pub fn with_strip(mut self, strip: u16) -> Self {
        self.strip = strip;
        self
    }

    pub fn with_frame(mut self, frame: u16) -> Self {
        self.frame = frame.max(1);
        self
    }

    pub fn with_frame_count(mut self, frame_count: u16) -> Self {
        self.frame_count = frame_count.max(1);
        self
    }

    pub fn with_frame_delay(mut self, ticks: u32) -> Self {
        self.frame_delay = Some(ticks.max(1));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_move_step(mut self, step: IVec2) -> Self {
        self.move_step = Some(step);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// The Action currently bound to this object
    pub fn action(&self) -> Option<ActionId> {
        self.action
    }

    pub fn mover(&self) -> Option<&Mover> {
        self.mover.as_ref()
    }

    /// Whether a Mover is still walking this object
    pub fn is_moving(&self) -> bool {
        self.mover.as_ref().is_some_and(|mover| !mover.has_arrived())
    }

    /// Whether a finite frame animation is still playing
    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    pub fn anim_mode(&self) -> AnimMode {
        self.animator.mode()
    }

    /// Start a Mover toward `target`, replacing any current one
    pub fn start_move(&mut self, target: IVec2, default_step: IVec2) {
        let step = self.move_step.unwrap_or(default_step);
        match &mut self.mover {
            Some(mover) => mover.configure(target, step),
            None => self.mover = Some(Mover::new(target, step)),
        }
    }

    pub fn animate(&mut self, mode: AnimMode) {
        self.animator.play(mode);
    }
}

/// Per-tick notifications produced while stepping objects
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectEvents {
    /// Objects whose Mover arrived this tick
    pub arrived: Vec<ObjectId>,
    /// Objects whose finite animation ended this tick
    pub animation_ended: Vec<ObjectId>,
}

/// All objects of one scene, addressable by id or by name
#[derive(Debug, Default)]
pub struct ObjectSet {
    objects: SlotMap<ObjectId, SceneObject>,
    names: HashMap<String, ObjectId>,
    /// Insertion order, for deterministic iteration
    order: Vec<ObjectId>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; names must be unique
    pub fn insert(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        if self.names.contains_key(&object.name) {
            return Err(SceneError::DuplicateObject(object.name));
        }
        let name = object.name.clone();
        let id = self.objects.insert(object);
        self.names.insert(name, id);
        self.order.push(id);
        Ok(id)
    }

    /// Remove an object, returns it if it existed
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let object = self.objects.remove(id)?;
        self.names.remove(&object.name);
        self.order.retain(|existing| *existing != id);
        Some(object)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    /// Look up an object id by name
    pub fn id(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&SceneObject> {
        self.id(name).and_then(|id| self.objects.get(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Iterate objects in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.order
            .iter()
            .filter_map(move |id| self.objects.get(*id).map(|object| (*id, object)))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Step every Mover, then every animator, in insertion order
    pub fn tick(
        &mut self,
        walk: &super::walk::WalkRegions,
        default_frame_delay: u32,
    ) -> ObjectEvents {
        let mut events = ObjectEvents::default();

        for id in &self.order {
            let Some(object) = self.objects.get_mut(*id) else {
                continue;
            };

            let mut moving = false;
            if let Some(mover) = &mut object.mover {
                moving = !mover.has_arrived();
                if mover.step(&mut object.position, walk) {
                    log::trace!("{} arrived at {}", object.name, object.position);
                    events.arrived.push(*id);
                }
            }
            if object.mover.as_ref().is_some_and(Mover::has_arrived) {
                object.mover = None;
            }

            let delay = object.frame_delay.unwrap_or(default_frame_delay);
            let frame_count = object.frame_count;
            if object
                .animator
                .update(&mut object.frame, frame_count, delay, moving)
            {
                events.animation_ended.push(*id);
            }
        }

        events
    }

    /// Forget every object (scene teardown)
    pub fn clear(&mut self) {
        self.objects.clear();
        self.names.clear();
        self.order.clear();
    }
}
