// Effect shell: runs one Action step and applies what it asked for
//
// Scripts only compute transitions. Everything that touches the scene
// (object mutation, starting children and sequences, host requests) is
// applied here, immediately and in effect order, so an Action later in the
// same pass already sees the result.

use super::object::{ObjectSet, SceneObject};
use super::palette::PaletteRotation;
use super::Stage;
use crate::engine::config::EngineConfig;
use crate::engine::error::SequenceError;
use crate::engine::ids::{ActionId, ObjectId, SequenceId};
use crate::script::action::{Awaitable, Effect, Next, Target, Transition};
use crate::script::scheduler::{Action, ActionScheduler, Resume, StepOutcome, WaitOn};
use crate::script::sequence::{SequenceManager, SequenceTable};
use crate::script::view::SceneView;

/// What the current step started, for `Awaitable::Child` and `Awaitable::Sequence`
#[derive(Debug, Default)]
struct Started {
    child: Option<ActionId>,
    sequence: Option<SequenceId>,
}

/// Mutable scene state borrowed for the scheduler pass
pub(super) struct EffectShell<'a> {
    pub stage: &'a mut Stage,
    pub sequences: &'a mut SequenceManager,
    pub table: &'a SequenceTable,
    pub config: &'a EngineConfig,
}

impl EffectShell<'_> {
    /// Run the next step of one Action
    pub fn advance(&mut self, scheduler: &mut ActionScheduler, id: ActionId) {
        let Some((script, state, owner)) = scheduler.begin_step(id) else {
            return;
        };
        let kind = script.kind();

        let transition = {
            let view = SceneView::new(
                &self.stage.objects,
                &self.stage.walk,
                &self.stage.requests,
                &self.stage.playing_sounds,
                owner,
                self.config.default_move_step,
                scheduler.current_tick(),
            );
            script.transition(&state, &view)
        };

        let Transition {
            effects,
            next,
            rewind,
            locals,
        } = transition;
        log::debug!(
            "[tick {}] {} step {}: {} effects, {:?}",
            scheduler.current_tick(),
            kind,
            state.step,
            effects.len(),
            next
        );

        let mut started = Started::default();
        for effect in effects {
            self.apply(scheduler, id, owner, effect, &mut started);
        }

        let resume = self.resolve(scheduler, kind, owner, next, &started);
        let outcome = StepOutcome {
            resume,
            rewind,
            locals,
        };
        if let Some(detached) = scheduler.finish_step(id, script, outcome) {
            self.detach(detached, id);
        }
    }

    /// Clear an object's back-reference if it still points at `action`
    fn detach(&mut self, object: ObjectId, action: ActionId) {
        if let Some(object) = self.stage.objects.get_mut(object) {
            if object.action == Some(action) {
                object.action = None;
            }
        }
    }

    fn target_mut(&mut self, target: &Target, owner: Option<ObjectId>) -> Option<&mut SceneObject> {
        let id = target.resolve(&self.stage.objects, owner)?;
        self.stage.objects.get_mut(id)
    }

    fn apply(
        &mut self,
        scheduler: &mut ActionScheduler,
        action: ActionId,
        owner: Option<ObjectId>,
        effect: Effect,
        started: &mut Started,
    ) {
        let default_move_step = self.config.default_move_step;

        match effect {
            Effect::SetPosition(ref target, position) => {
                self.with_object(target, owner, &effect, |object| object.position = position)
            }
            Effect::SetVisage(ref target, visage) => {
                self.with_object(target, owner, &effect, |object| object.visage = visage)
            }
            Effect::SetStrip(ref target, strip) => {
                self.with_object(target, owner, &effect, |object| object.strip = strip)
            }
            Effect::SetFrame(ref target, frame) => {
                self.with_object(target, owner, &effect, |object| object.frame = frame.max(1))
            }
            Effect::SetFrameCount(ref target, count) => {
                self.with_object(target, owner, &effect, |object| {
                    object.frame_count = count.max(1)
                })
            }
            Effect::SetFrameDelay(ref target, ticks) => {
                self.with_object(target, owner, &effect, |object| {
                    object.frame_delay = Some(ticks.max(1))
                })
            }
            Effect::SetZoom(ref target, zoom) => {
                self.with_object(target, owner, &effect, |object| object.zoom = zoom)
            }
            Effect::FixPriority(ref target, priority) => {
                self.with_object(target, owner, &effect, |object| {
                    object.priority = Some(priority)
                })
            }
            Effect::Show(ref target) => {
                self.with_object(target, owner, &effect, |object| object.visible = true)
            }
            Effect::Hide(ref target) => {
                self.with_object(target, owner, &effect, |object| object.visible = false)
            }
            Effect::Animate(ref target, mode) => {
                self.with_object(target, owner, &effect, |object| object.animate(mode))
            }
            Effect::MoveTo(ref target, point) => {
                self.with_object(target, owner, &effect, |object| {
                    object.start_move(point, default_move_step)
                })
            }
            Effect::SetMoveStep(ref target, step) => {
                self.with_object(target, owner, &effect, |object| {
                    object.move_step = Some(step)
                })
            }
            Effect::RemoveObject(target) => {
                let Some(id) = target.resolve(&self.stage.objects, owner) else {
                    log::warn!("RemoveObject({:?}): no such object", target);
                    return;
                };
                if let Some(object) = self.stage.objects.remove(id) {
                    log::debug!("Removed {}", object.name);
                    if let Some(bound) = object.action {
                        scheduler.cancel(bound);
                    }
                }
                // Nothing can arrive or finish animating any more
                scheduler.notify(WaitOn::Motion(id));
                scheduler.notify(WaitOn::Animation(id));
            }
            Effect::AddRotation { start, end, delay } => {
                self.stage
                    .palette
                    .add_rotation(PaletteRotation::new(start, end, delay));
            }
            Effect::ClearRotations => self.stage.palette.clear_rotations(),
            Effect::StartSequence { id, participants } => {
                self.start_sequence(action, owner, id, &participants, started)
            }
            Effect::StartAction { target, script } => {
                let bound = match &target {
                    Some(target) => match target.resolve(&self.stage.objects, owner) {
                        Some(id) => Some(id),
                        None => {
                            log::warn!("StartAction({}): no object {:?}", script.kind(), target);
                            return;
                        }
                    },
                    None => None,
                };
                let child = start_bound(
                    scheduler,
                    &mut self.stage.objects,
                    bound,
                    Action::new(script, bound),
                );
                started.child = Some(child);
            }
            Effect::Signal(target) => {
                let bound = target
                    .resolve(&self.stage.objects, owner)
                    .and_then(|id| self.stage.objects.get(id))
                    .and_then(SceneObject::action);
                match bound {
                    Some(bound) => scheduler.signal(bound),
                    None => log::warn!("Signal({:?}): no Action to wake", target),
                }
            }
            Effect::EnableWalkRegion(region) => self.stage.walk.enable(region),
            Effect::DisableWalkRegion(region) => self.stage.walk.disable(region),
            Effect::Request(request) => self.stage.requests.push(request),
            Effect::ChangeScene(scene) => {
                log::info!("Scene change to {} requested", scene);
                self.stage.pending_change = Some(scene);
            }
        }
    }

    /// Apply a mutation to a resolved object, warning when it is missing
    fn with_object<F>(
        &mut self,
        target: &Target,
        owner: Option<ObjectId>,
        effect: &Effect,
        mutate: F,
    ) where
        F: FnOnce(&mut SceneObject),
    {
        match self.target_mut(target, owner) {
            Some(object) => mutate(object),
            None => log::warn!("{:?}: no such object, skipped", effect),
        }
    }

    fn start_sequence(
        &mut self,
        action: ActionId,
        owner: Option<ObjectId>,
        sequence: u32,
        participants: &[Target],
        started: &mut Started,
    ) {
        let resolved: Result<Vec<ObjectId>, SequenceError> = participants
            .iter()
            .enumerate()
            .map(|(index, target)| {
                target
                    .resolve(&self.stage.objects, owner)
                    .ok_or(SequenceError::UnknownParticipant { sequence, index })
            })
            .collect();
        let started_run = resolved.and_then(|resolved| {
            self.sequences
                .start(self.table, sequence, Some(action), &resolved)
        });
        match started_run {
            Ok(id) => started.sequence = Some(id),
            Err(err) => {
                log::error!("Cannot start sequence {}: {}", sequence, err);
                assert!(!self.config.strict, "malformed sequence {}: {}", sequence, err);
            }
        }
    }

    /// Turn the step's `Next` into a scheduler resumption
    ///
    /// Awaits that can never complete degrade to resuming next tick.
    fn resolve(
        &self,
        scheduler: &ActionScheduler,
        kind: &str,
        owner: Option<ObjectId>,
        next: Next,
        started: &Started,
    ) -> Resume {
        let wait = match next {
            Next::Delay(ticks) => return Resume::Delay(ticks),
            Next::Complete => return Resume::Complete,
            Next::Await(Awaitable::Signal) => Some(WaitOn::Signal),
            Next::Await(Awaitable::Child) => started
                .child
                .filter(|child| scheduler.is_live(*child))
                .map(WaitOn::Child),
            Next::Await(Awaitable::Sequence) => started
                .sequence
                .filter(|sequence| self.sequences.is_running(*sequence))
                .map(WaitOn::Sequence),
            Next::Await(Awaitable::Motion(ref target)) => target
                .resolve(&self.stage.objects, owner)
                .filter(|id| self.stage.objects.get(*id).is_some_and(SceneObject::is_moving))
                .map(WaitOn::Motion),
            Next::Await(Awaitable::Animation(ref target)) => target
                .resolve(&self.stage.objects, owner)
                .filter(|id| {
                    self.stage
                        .objects
                        .get(*id)
                        .is_some_and(SceneObject::is_animating)
                })
                .map(WaitOn::Animation),
        };

        match wait {
            Some(wait) => Resume::Wait(wait),
            None => {
                log::warn!("{}: nothing to wait for in {:?}, resuming next tick", kind, next);
                Resume::Delay(1)
            }
        }
    }
}

/// Register an Action and bind it to its object, replacing any previous one
pub(super) fn start_bound(
    scheduler: &mut ActionScheduler,
    objects: &mut ObjectSet,
    owner: Option<ObjectId>,
    action: Action,
) -> ActionId {
    let kind = action.kind();
    let id = scheduler.register(action);
    if let Some(object) = owner.and_then(|owner| objects.get_mut(owner)) {
        if let Some(previous) = object.action.replace(id) {
            log::debug!("{} replaces the Action of {}", kind, object.name);
            scheduler.cancel(previous);
        }
    }
    id
}
