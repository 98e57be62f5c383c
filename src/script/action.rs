// Action step contract
//
// An Action is a stateless script plus a small record of where it is. Every
// tick the scheduler hands the script its captured step number and locals,
// and the script answers with a `Transition`: the effects of that one step
// and how it suspends afterwards. Scripts never touch the scene directly.

use std::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::view::SceneView;
use crate::engine::ids::ObjectId;
use crate::engine::requests::HostRequest;
use crate::scene::animation::AnimMode;
use crate::scene::object::ObjectSet;

/// Number of scalar locals an Action carries across steps
pub const LOCAL_SLOTS: usize = 4;

/// Small per-Action scalar state, saved alongside the step counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locals([i32; LOCAL_SLOTS]);

impl Locals {
    /// Read a slot; out-of-range slots read as zero
    pub fn get(&self, slot: usize) -> i32 {
        self.0.get(slot).copied().unwrap_or(0)
    }

    /// Write a slot; out-of-range writes are ignored
    pub fn set(&mut self, slot: usize, value: i32) {
        if let Some(entry) = self.0.get_mut(slot) {
            *entry = value;
        }
    }

    /// Copy with one slot replaced
    pub fn with(mut self, slot: usize, value: i32) -> Self {
        self.set(slot, value);
        self
    }
}

/// What a script sees when it is re-entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepState {
    /// Step number captured before the counter was incremented
    pub step: u32,
    pub locals: Locals,
}

/// Which object an effect applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The object owning the running Action
    Owner,
    /// An object looked up by its scene name
    Named(String),
    /// An object by id
    Id(ObjectId),
}

impl Target {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }

    /// Resolve to a live object id
    pub fn resolve(&self, objects: &ObjectSet, owner: Option<ObjectId>) -> Option<ObjectId> {
        match self {
            Self::Owner => owner.filter(|id| objects.contains(*id)),
            Self::Named(name) => objects.id(name),
            Self::Id(id) => Some(*id).filter(|id| objects.contains(*id)),
        }
    }
}

/// A side effect requested by one step
pub enum Effect {
    SetPosition(Target, IVec2),
    SetVisage(Target, u32),
    SetStrip(Target, u16),
    SetFrame(Target, u16),
    SetFrameCount(Target, u16),
    SetFrameDelay(Target, u32),
    SetZoom(Target, u16),
    FixPriority(Target, i32),
    Show(Target),
    Hide(Target),
    /// Start a frame animation
    Animate(Target, AnimMode),
    /// Start a Mover toward a point
    MoveTo(Target, IVec2),
    SetMoveStep(Target, IVec2),
    /// Remove an object; its Action is cancelled
    RemoveObject(Target),
    AddRotation { start: u8, end: u8, delay: u32 },
    ClearRotations,
    /// Run a choreography from the sequence table with these participants
    StartSequence { id: u32, participants: Vec<Target> },
    /// Start an Action on an object (or on the scene when `target` is `None`)
    StartAction {
        target: Option<Target>,
        script: Box<dyn ActionScript>,
    },
    /// Wake the Action bound to an object
    Signal(Target),
    EnableWalkRegion(u32),
    DisableWalkRegion(u32),
    Request(HostRequest),
    ChangeScene(u32),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetPosition(t, p) => write!(f, "SetPosition({t:?}, {p})"),
            Self::SetVisage(t, v) => write!(f, "SetVisage({t:?}, {v})"),
            Self::SetStrip(t, s) => write!(f, "SetStrip({t:?}, {s})"),
            Self::SetFrame(t, n) => write!(f, "SetFrame({t:?}, {n})"),
            Self::SetFrameCount(t, n) => write!(f, "SetFrameCount({t:?}, {n})"),
            Self::SetFrameDelay(t, n) => write!(f, "SetFrameDelay({t:?}, {n})"),
            Self::SetZoom(t, z) => write!(f, "SetZoom({t:?}, {z})"),
            Self::FixPriority(t, p) => write!(f, "FixPriority({t:?}, {p})"),
            Self::Show(t) => write!(f, "Show({t:?})"),
            Self::Hide(t) => write!(f, "Hide({t:?})"),
            Self::Animate(t, m) => write!(f, "Animate({t:?}, {m:?})"),
            Self::MoveTo(t, p) => write!(f, "MoveTo({t:?}, {p})"),
            Self::SetMoveStep(t, s) => write!(f, "SetMoveStep({t:?}, {s})"),
            Self::RemoveObject(t) => write!(f, "RemoveObject({t:?})"),
            Self::AddRotation { start, end, delay } => {
                write!(f, "AddRotation({start}..={end}, every {delay})")
            }
            Self::ClearRotations => write!(f, "ClearRotations"),
            Self::StartSequence { id, participants } => {
                write!(f, "StartSequence({id}, {} participants)", participants.len())
            }
            Self::StartAction { target, script } => {
                write!(f, "StartAction({target:?}, {})", script.kind())
            }
            Self::Signal(t) => write!(f, "Signal({t:?})"),
            Self::EnableWalkRegion(id) => write!(f, "EnableWalkRegion({id})"),
            Self::DisableWalkRegion(id) => write!(f, "DisableWalkRegion({id})"),
            Self::Request(request) => write!(f, "Request({request:?})"),
            Self::ChangeScene(id) => write!(f, "ChangeScene({id})"),
        }
    }
}

/// Something a step can wait for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Awaitable {
    /// The Action started by this step's `StartAction`
    Child,
    /// The sequence started by this step's `StartSequence`
    Sequence,
    /// Arrival of the object's Mover
    Motion(Target),
    /// End of the object's finite frame animation
    Animation(Target),
    /// An explicit `Signal` from another Action
    Signal,
}

/// How a step suspends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Resume after `n` ticks; `0` re-enters later within the same tick
    Delay(u32),
    /// Resume on the tick after the awaited completion
    Await(Awaitable),
    /// Terminal: detach from the owner and the scheduler
    Complete,
}

/// Result of one step: its effects and exactly one suspension
#[derive(Debug)]
pub struct Transition {
    pub effects: Vec<Effect>,
    pub next: Next,
    /// Explicit step-coded reset of the counter
    pub rewind: Option<u32>,
    /// Replacement locals, if the step changed them
    pub locals: Option<Locals>,
}

impl Transition {
    fn with_next(next: Next) -> Self {
        Self {
            effects: Vec::new(),
            next,
            rewind: None,
            locals: None,
        }
    }

    pub fn delay(ticks: u32) -> Self {
        Self::with_next(Next::Delay(ticks))
    }

    pub fn wait(awaitable: Awaitable) -> Self {
        Self::with_next(Next::Await(awaitable))
    }

    pub fn wait_child() -> Self {
        Self::wait(Awaitable::Child)
    }

    pub fn wait_sequence() -> Self {
        Self::wait(Awaitable::Sequence)
    }

    pub fn wait_motion(target: Target) -> Self {
        Self::wait(Awaitable::Motion(target))
    }

    pub fn wait_animation(target: Target) -> Self {
        Self::wait(Awaitable::Animation(target))
    }

    /// Park until another Action signals this one
    pub fn idle() -> Self {
        Self::wait(Awaitable::Signal)
    }

    pub fn complete() -> Self {
        Self::with_next(Next::Complete)
    }

    /// Append an effect
    pub fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Jump back to `step` for the next re-entry
    pub fn rewind_to(mut self, step: u32) -> Self {
        self.rewind = Some(step);
        self
    }

    pub fn with_locals(mut self, locals: Locals) -> Self {
        self.locals = Some(locals);
        self
    }
}

/// Step-indexed behavior bound to one object
///
/// Implementations are stateless: everything that must survive between
/// steps lives in the step counter and `Locals`, which is what makes an
/// Action saveable mid-cutscene.
pub trait ActionScript: fmt::Debug {
    /// Stable name used to recreate the script when restoring a save
    fn kind(&self) -> &'static str;

    /// Compute one step from the captured step number
    fn transition(&self, state: &StepState, scene: &SceneView<'_>) -> Transition;
}
