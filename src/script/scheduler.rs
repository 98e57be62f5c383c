// Per-scene Action scheduler
//
// Owns every Action of a scene in an id-indexed arena and advances the ready
// ones once per tick in registration order. Objects and parent Actions only
// ever hold `ActionId`s, so clearing the arena invalidates all of them at
// once.

use std::collections::VecDeque;

use slotmap::SlotMap;

use super::action::{ActionScript, Locals, StepState};
use crate::engine::ids::{ActionId, ObjectId, SequenceId};

/// A completion an Action can be suspended on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitOn {
    Child(ActionId),
    Motion(ObjectId),
    Animation(ObjectId),
    Sequence(SequenceId),
    Signal,
}

/// How a finished step leaves the Action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Delay(u32),
    Wait(WaitOn),
    Complete,
}

/// Scheduler-side outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub resume: Resume,
    pub rewind: Option<u32>,
    pub locals: Option<Locals>,
}

impl StepOutcome {
    pub fn new(resume: Resume) -> Self {
        Self {
            resume,
            rewind: None,
            locals: None,
        }
    }
}

/// One live Action record
#[derive(Debug)]
pub struct Action {
    script: Option<Box<dyn ActionScript>>,
    kind: &'static str,
    owner: Option<ObjectId>,
    step: u32,
    delay: u32,
    waiting: Option<WaitOn>,
    completed: bool,
    locals: Locals,
    /// First tick on which the Action may be advanced
    eligible_from: u64,
    /// A signal arrived while the Action was not parked on one
    signal_latched: bool,
    /// Same-tick re-entries used during the current tick
    reentries: u32,
}

impl Action {
    /// Create an Action at step 0, ready, bound to `owner`
    pub fn new(script: Box<dyn ActionScript>, owner: Option<ObjectId>) -> Self {
        Self {
            kind: script.kind(),
            script: Some(script),
            owner,
            step: 0,
            delay: 0,
            waiting: None,
            completed: false,
            locals: Locals::default(),
            eligible_from: 0,
            signal_latched: false,
            reentries: 0,
        }
    }

    /// Rebuild an Action at a saved resumption point without running anything
    pub(crate) fn restored(
        script: Box<dyn ActionScript>,
        owner: Option<ObjectId>,
        step: u32,
        delay: u32,
        locals: Locals,
        signal_latched: bool,
    ) -> Self {
        Self {
            step,
            delay,
            locals,
            signal_latched,
            ..Self::new(script, owner)
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    /// Step number the next advance will run
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn waiting(&self) -> Option<WaitOn> {
        self.waiting
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn locals(&self) -> Locals {
        self.locals
    }

    pub fn signal_latched(&self) -> bool {
        self.signal_latched
    }
}

/// Arena and driver for one scene's Actions
#[derive(Debug)]
pub struct ActionScheduler {
    actions: SlotMap<ActionId, Action>,
    /// Registration order; ties between ready Actions break by position here
    order: Vec<ActionId>,
    /// Actions that asked for `Delay(0)` during the current tick
    reentry: VecDeque<ActionId>,
    tick: u64,
    in_tick: bool,
    max_reentries: u32,
}

impl ActionScheduler {
    pub fn new(max_reentries: u32) -> Self {
        Self {
            actions: SlotMap::with_key(),
            order: Vec::new(),
            reentry: VecDeque::new(),
            tick: 0,
            in_tick: false,
            max_reentries,
        }
    }

    /// Add an Action; it first becomes eligible on the next tick
    pub fn register(&mut self, mut action: Action) -> ActionId {
        action.eligible_from = self.tick + 1;
        let kind = action.kind;
        let id = self.actions.insert(action);
        self.order.push(id);
        log::debug!("Registered {} as {:?} (eligible at tick {})", kind, id, self.tick + 1);
        id
    }

    /// Run one tick
    ///
    /// `advance` is called for every ready Action, in registration order. It
    /// receives the scheduler itself so it can register children, complete
    /// Actions and deliver notifications while the pass is running.
    pub fn tick<F>(&mut self, mut advance: F)
    where
        F: FnMut(&mut Self, ActionId),
    {
        self.tick += 1;
        self.in_tick = true;
        for action in self.actions.values_mut() {
            action.reentries = 0;
        }

        // The order may grow while iterating; new entries are not eligible yet
        let mut index = 0;
        while index < self.order.len() {
            let id = self.order[index];
            index += 1;
            if self.take_ready(id) {
                advance(self, id);
            }
        }

        while let Some(id) = self.reentry.pop_front() {
            let ready = self
                .actions
                .get(id)
                .is_some_and(|a| !a.completed && a.waiting.is_none() && a.delay == 0);
            if ready {
                advance(self, id);
            }
        }

        self.in_tick = false;
        self.purge_completed();
    }

    /// Apply the suspension rules for one Action, returns true if it runs now
    fn take_ready(&mut self, id: ActionId) -> bool {
        let tick = self.tick;
        let Some(action) = self.actions.get_mut(id) else {
            return false;
        };
        if action.completed || action.waiting.is_some() || action.eligible_from > tick {
            return false;
        }
        if action.delay > 0 {
            action.delay -= 1;
            if action.delay > 0 {
                return false;
            }
        }
        true
    }

    /// Capture the step to run and increment the counter
    ///
    /// Returns `None` for completed or unknown Actions, which makes advancing
    /// a finished Action a no-op.
    pub fn begin_step(
        &mut self,
        id: ActionId,
    ) -> Option<(Box<dyn ActionScript>, StepState, Option<ObjectId>)> {
        let action = self.actions.get_mut(id)?;
        if action.completed {
            return None;
        }
        let script = action.script.take()?;
        let state = StepState {
            step: action.step,
            locals: action.locals,
        };
        action.step += 1;
        Some((script, state, action.owner))
    }

    /// Store the outcome of a step started with `begin_step`
    ///
    /// Returns the owner to detach when the step completed the Action.
    pub fn finish_step(
        &mut self,
        id: ActionId,
        script: Box<dyn ActionScript>,
        outcome: StepOutcome,
    ) -> Option<ObjectId> {
        let tick = self.tick;
        let in_tick = self.in_tick;
        let max_reentries = self.max_reentries;

        let action = self.actions.get_mut(id)?;
        // Cancelled by one of its own effects
        if action.completed {
            return None;
        }
        action.script = Some(script);

        if let Some(step) = outcome.rewind {
            log::trace!("{} rewinds to step {}", action.kind, step);
            action.step = step;
        }
        if let Some(locals) = outcome.locals {
            action.locals = locals;
        }

        match outcome.resume {
            Resume::Delay(0) if in_tick && action.reentries < max_reentries => {
                action.reentries += 1;
                action.delay = 0;
                self.reentry.push_back(id);
            }
            Resume::Delay(0) => {
                if in_tick {
                    log::warn!(
                        "{} exceeded {} same-tick re-entries, deferring to next tick",
                        action.kind,
                        max_reentries
                    );
                }
                action.delay = 0;
                action.eligible_from = tick + 1;
            }
            Resume::Delay(ticks) => action.delay = ticks,
            Resume::Wait(WaitOn::Signal) if action.signal_latched => {
                action.signal_latched = false;
                action.eligible_from = tick + 1;
            }
            Resume::Wait(wait) => action.waiting = Some(wait),
            Resume::Complete => return self.complete(id),
        }
        None
    }

    /// Mark an Action finished and wake any parent waiting on it
    ///
    /// Returns the owner so the caller can clear the object's back-reference.
    pub fn complete(&mut self, id: ActionId) -> Option<ObjectId> {
        let action = self.actions.get_mut(id)?;
        if action.completed {
            return None;
        }
        action.completed = true;
        action.waiting = None;
        action.script = None;
        let owner = action.owner;
        log::debug!("{} ({:?}) completed at tick {}", action.kind, id, self.tick);
        self.notify(WaitOn::Child(id));
        owner
    }

    /// Stop an Action from outside (its object was removed or given a new Action)
    pub fn cancel(&mut self, id: ActionId) -> Option<ObjectId> {
        if let Some(action) = self.actions.get(id).filter(|a| !a.completed) {
            log::debug!("Cancelling {} ({:?}) at step {}", action.kind, id, action.step);
        }
        self.complete(id)
    }

    /// Deliver a completion; every Action waiting on it resumes next tick
    pub fn notify(&mut self, event: WaitOn) -> usize {
        let resume_at = self.tick + 1;
        let mut woken = 0;
        for action in self.actions.values_mut() {
            if !action.completed && action.waiting == Some(event) {
                action.waiting = None;
                action.eligible_from = resume_at;
                woken += 1;
            }
        }
        woken
    }

    /// Wake an Action parked on `Signal`, or latch the signal for later
    pub fn signal(&mut self, id: ActionId) {
        let resume_at = self.tick + 1;
        let Some(action) = self.actions.get_mut(id) else {
            return;
        };
        if action.completed {
            return;
        }
        if action.waiting == Some(WaitOn::Signal) {
            action.waiting = None;
            action.eligible_from = resume_at;
        } else {
            action.signal_latched = true;
        }
    }

    /// Clear a wait without its completion (used when restoring transient waits)
    pub(crate) fn set_waiting(&mut self, id: ActionId, wait: Option<WaitOn>) {
        if let Some(action) = self.actions.get_mut(id) {
            action.waiting = wait;
        }
    }

    /// Drop every Action at once
    pub fn clear(&mut self) {
        self.actions.clear();
        self.order.clear();
        self.reentry.clear();
    }

    /// Restart tick counting (used when restoring a save)
    pub(crate) fn set_current_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    fn purge_completed(&mut self) {
        let actions = &self.actions;
        self.order
            .retain(|id| actions.get(*id).is_some_and(|a| !a.completed));
        self.actions.retain(|_, action| !action.completed);
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id)
    }

    /// Whether an id refers to an Action that may still run
    pub fn is_live(&self, id: ActionId) -> bool {
        self.actions.get(id).is_some_and(|a| !a.completed)
    }

    /// Live Actions in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.order.iter().filter_map(move |id| {
            self.actions
                .get(*id)
                .filter(|a| !a.completed)
                .map(|a| (*id, a))
        })
    }

    /// Number of Actions not yet purged
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of the most recent tick
    pub fn current_tick(&self) -> u64 {
        self.tick
    }
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::action::Transition;
    use crate::script::view::SceneView;
    use std::collections::HashMap;

    /// Placeholder script; the tests below decide outcomes themselves
    #[derive(Debug)]
    struct Scripted;

    impl ActionScript for Scripted {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn transition(&self, _: &StepState, _: &SceneView<'_>) -> Transition {
            Transition::complete()
        }
    }

    /// Drives a scheduler with per-Action outcome tables and records what ran
    struct Harness {
        scheduler: ActionScheduler,
        plans: HashMap<ActionId, Vec<Resume>>,
        log: Vec<(u64, ActionId, u32)>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scheduler: ActionScheduler::new(3),
                plans: HashMap::new(),
                log: Vec::new(),
            }
        }

        fn add(&mut self, plan: Vec<Resume>) -> ActionId {
            let id = self.scheduler.register(Action::new(Box::new(Scripted), None));
            self.plans.insert(id, plan);
            id
        }

        fn tick(&mut self) {
            let plans = &self.plans;
            let log = &mut self.log;
            self.scheduler.tick(|scheduler, id| {
                let Some((script, state, _)) = scheduler.begin_step(id) else {
                    return;
                };
                log.push((scheduler.current_tick(), id, state.step));
                let resume = plans
                    .get(&id)
                    .and_then(|plan| plan.get(state.step as usize).copied())
                    .unwrap_or(Resume::Complete);
                scheduler.finish_step(id, script, StepOutcome::new(resume));
            });
        }

        fn runs_of(&self, id: ActionId) -> Vec<(u64, u32)> {
            self.log
                .iter()
                .filter(|(_, logged, _)| *logged == id)
                .map(|(tick, _, step)| (*tick, *step))
                .collect()
        }
    }

    #[test]
    fn test_registered_action_runs_next_tick() {
        let mut harness = Harness::new();
        let id = harness.add(vec![Resume::Complete]);
        assert!(harness.scheduler.is_live(id));

        harness.tick();
        assert_eq!(harness.runs_of(id), vec![(1, 0)]);
        assert!(!harness.scheduler.is_live(id));
        assert!(harness.scheduler.is_empty(), "Completed Actions are purged");
    }

    #[test]
    fn test_delay_fires_exactly_on_tick_n() {
        let mut harness = Harness::new();
        let id = harness.add(vec![Resume::Delay(5), Resume::Complete]);

        for _ in 0..10 {
            harness.tick();
        }
        // Step 0 on tick 1 asks for 5 ticks, so step 1 runs on tick 6
        assert_eq!(harness.runs_of(id), vec![(1, 0), (6, 1)]);
    }

    #[test]
    fn test_step_counter_is_monotonic() {
        let mut harness = Harness::new();
        let id = harness.add(vec![
            Resume::Delay(1),
            Resume::Delay(2),
            Resume::Delay(1),
            Resume::Complete,
        ]);

        let mut last = 0;
        for _ in 0..10 {
            harness.tick();
            if let Some(action) = harness.scheduler.get(id) {
                assert!(action.step() >= last);
                last = action.step();
            }
        }
        let steps: Vec<u32> = harness.runs_of(id).iter().map(|(_, s)| *s).collect();
        assert_eq!(steps, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parent_resumes_tick_after_child_completes() {
        let mut harness = Harness::new();
        let parent = harness.add(vec![Resume::Delay(1)]);
        // Replace the parent plan once the child exists
        let child = harness.add(vec![Resume::Delay(3), Resume::Complete]);
        harness
            .plans
            .insert(parent, vec![Resume::Wait(WaitOn::Child(child)), Resume::Complete]);

        harness.tick(); // parent waits, child delays 3
        assert_eq!(
            harness.scheduler.get(parent).and_then(Action::waiting),
            Some(WaitOn::Child(child))
        );

        harness.tick();
        harness.tick();
        assert!(harness.runs_of(parent).len() == 1, "Parent must not run while child is pending");

        harness.tick(); // child completes on tick 4
        assert_eq!(harness.runs_of(child), vec![(1, 0), (4, 1)]);
        assert_eq!(harness.runs_of(parent), vec![(1, 0)]);

        harness.tick();
        assert_eq!(harness.runs_of(parent), vec![(1, 0), (5, 1)]);
    }

    #[test]
    fn test_child_registered_after_parent_same_tick_wake_is_deferred() {
        // The child sits before the parent in registration order and completes
        // first in the pass; the parent must still wait for the next tick.
        let mut harness = Harness::new();
        let child = harness.add(vec![Resume::Delay(1), Resume::Complete]);
        let parent = harness.add(vec![Resume::Wait(WaitOn::Child(child)), Resume::Complete]);

        harness.tick();
        harness.tick(); // child completes on tick 2 before the parent is visited
        assert_eq!(harness.runs_of(parent), vec![(1, 0)]);

        harness.tick();
        assert_eq!(harness.runs_of(parent), vec![(1, 0), (3, 1)]);
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        let mut harness = Harness::new();
        let first = harness.add(vec![Resume::Complete]);
        let second = harness.add(vec![Resume::Complete]);
        let third = harness.add(vec![Resume::Complete]);

        harness.tick();
        let order: Vec<ActionId> = harness.log.iter().map(|(_, id, _)| *id).collect();
        assert_eq!(order, vec![first, second, third]);
    }

    #[test]
    fn test_delay_zero_reenters_same_tick_after_pass() {
        let mut harness = Harness::new();
        let looping = harness.add(vec![Resume::Delay(0), Resume::Complete]);
        let other = harness.add(vec![Resume::Complete]);

        harness.tick();
        let order: Vec<(ActionId, u32)> = harness.log.iter().map(|(_, id, s)| (*id, *s)).collect();
        assert_eq!(order, vec![(looping, 0), (other, 0), (looping, 1)]);
    }

    #[test]
    fn test_delay_zero_reentries_are_bounded() {
        let mut harness = Harness::new();
        let spinner = harness.add(vec![Resume::Delay(0); 10]);

        harness.tick();
        // One main-pass run plus three re-entries, then deferral
        assert_eq!(harness.runs_of(spinner).len(), 4);

        harness.tick();
        assert_eq!(harness.runs_of(spinner).len(), 8);
    }

    #[test]
    fn test_complete_is_idempotent_and_advance_is_noop() {
        let mut scheduler = ActionScheduler::default();
        let id = scheduler.register(Action::new(Box::new(Scripted), None));

        assert_eq!(scheduler.complete(id), None);
        assert_eq!(scheduler.complete(id), None);
        assert!(scheduler.begin_step(id).is_none());
    }

    #[test]
    fn test_signal_wakes_parked_action() {
        let mut harness = Harness::new();
        let id = harness.add(vec![Resume::Wait(WaitOn::Signal), Resume::Complete]);

        harness.tick();
        harness.tick();
        assert_eq!(harness.runs_of(id).len(), 1);

        harness.scheduler.signal(id);
        harness.tick();
        assert_eq!(harness.runs_of(id), vec![(1, 0), (3, 1)]);
    }

    #[test]
    fn test_signal_latches_until_parked() {
        let mut harness = Harness::new();
        let id = harness.add(vec![
            Resume::Delay(2),
            Resume::Wait(WaitOn::Signal),
            Resume::Complete,
        ]);

        harness.tick(); // step 0, delay 2
        harness.scheduler.signal(id);
        assert!(harness.scheduler.get(id).is_some_and(Action::signal_latched));

        harness.tick();
        harness.tick(); // step 1 parks, latch wakes it for tick 4
        harness.tick();
        assert_eq!(harness.runs_of(id), vec![(1, 0), (3, 1), (4, 2)]);
    }

    #[test]
    fn test_notify_wakes_only_matching_waiters() {
        let mut scheduler = ActionScheduler::default();
        let mut objects: SlotMap<ObjectId, ()> = SlotMap::with_key();
        let walker = objects.insert(());
        let dancer = objects.insert(());

        let a = scheduler.register(Action::new(Box::new(Scripted), Some(walker)));
        let b = scheduler.register(Action::new(Box::new(Scripted), Some(dancer)));
        scheduler.set_waiting(a, Some(WaitOn::Motion(walker)));
        scheduler.set_waiting(b, Some(WaitOn::Animation(dancer)));

        assert_eq!(scheduler.notify(WaitOn::Motion(walker)), 1);
        assert_eq!(scheduler.get(a).and_then(Action::waiting), None);
        assert_eq!(
            scheduler.get(b).and_then(Action::waiting),
            Some(WaitOn::Animation(dancer))
        );
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut harness = Harness::new();
        let id = harness.add(vec![Resume::Delay(100)]);
        harness.tick();

        harness.scheduler.clear();
        assert!(harness.scheduler.is_empty());
        assert!(!harness.scheduler.is_live(id));

        harness.tick();
        assert_eq!(harness.runs_of(id).len(), 1);
    }

    #[test]
    fn test_rewind_resets_counter() {
        let mut scheduler = ActionScheduler::default();
        let id = scheduler.register(Action::new(Box::new(Scripted), None));
        scheduler.tick(|scheduler, id| {
            let (script, state, _) = scheduler.begin_step(id).expect("ready");
            assert_eq!(state.step, 0);
            let mut outcome = StepOutcome::new(Resume::Delay(1));
            outcome.rewind = Some(0);
            scheduler.finish_step(id, script, outcome);
        });
        assert_eq!(scheduler.get(id).map(Action::step), Some(0));
    }
}
