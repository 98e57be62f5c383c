// Multi-object choreography
//
// A sequence descriptor holds one command list per participant. Each list
// runs independently, instant commands back-to-back within a tick until a
// suspending one (delay, movement, finite animation). A run is finished
// only once every participant has exhausted its list.
//
// Sequences tick after objects, so a `MoveTo` issued here takes its first
// step on the following tick, one tick later than a `MoveTo` effect from an
// Action.

use std::collections::HashMap;

use glam::IVec2;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::engine::error::{SequenceError, SnapshotError};
use crate::engine::ids::{ActionId, ObjectId, SequenceId};
use crate::scene::animation::AnimMode;
use crate::scene::object::ObjectSet;

/// One instruction in a participant's command list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceCommand {
    SetPosition { x: i32, y: i32 },
    /// Start a Mover and wait for it to arrive
    MoveTo { x: i32, y: i32 },
    SetVisage(u32),
    SetStrip(u16),
    SetFrame(u16),
    SetFrameCount(u16),
    SetMoveStep { x: i32, y: i32 },
    SetZoom(u16),
    FixPriority(i32),
    Show,
    Hide,
    /// Start an animation without waiting
    Animate(AnimMode),
    /// Start a finite animation and wait for its end
    AnimateAndWait(AnimMode),
    /// Suspend this participant for a number of ticks
    Delay(u32),
}

/// Command lists for every participant of one sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    pub participants: Vec<Vec<SequenceCommand>>,
}

/// Externally supplied descriptors keyed by sequence number
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceTable {
    descriptors: HashMap<u32, SequenceDescriptor>,
}

impl SequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table of the form `{"201": {"participants": [[...], ...]}}`
    pub fn from_json_str(json: &str) -> Result<Self, SequenceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, id: u32, descriptor: SequenceDescriptor) {
        self.descriptors.insert(id, descriptor);
    }

    pub fn get(&self, id: u32) -> Option<&SequenceDescriptor> {
        self.descriptors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// What a participant's track is suspended on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackWait {
    /// Remaining ticks
    Delay(u32),
    Motion,
    Animation,
}

/// Saved progress of one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Participant name, `None` once the object was removed
    pub participant: Option<String>,
    /// Index of the next command to run
    pub next: usize,
    pub wait: Option<TrackWait>,
    pub done: bool,
}

/// Saved state of one running sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub sequence: u32,
    /// Index of the owning Action within the same save
    pub owner: Option<usize>,
    pub tracks: Vec<TrackSnapshot>,
}

/// Progress of one participant through its command list
#[derive(Debug, Clone)]
struct Track {
    object: ObjectId,
    commands: Vec<SequenceCommand>,
    next: usize,
    wait: Option<TrackWait>,
    done: bool,
}

impl Track {
    /// Run commands until one suspends or the list ends
    fn run(&mut self, sequence: u32, objects: &mut ObjectSet, default_move_step: IVec2) {
        if self.done {
            return;
        }
        let Some(object) = objects.get_mut(self.object) else {
            log::warn!(
                "Sequence {}: participant removed, treating its track as finished",
                sequence
            );
            self.done = true;
            return;
        };

        match self.wait {
            Some(TrackWait::Delay(ticks)) if ticks > 1 => {
                self.wait = Some(TrackWait::Delay(ticks - 1));
                return;
            }
            Some(TrackWait::Motion) if object.is_moving() => return,
            Some(TrackWait::Animation) if object.is_animating() => return,
            _ => self.wait = None,
        }

        while let Some(command) = self.commands.get(self.next).copied() {
            self.next += 1;
            match command {
                SequenceCommand::SetPosition { x, y } => object.position = IVec2::new(x, y),
                SequenceCommand::MoveTo { x, y } => {
                    object.start_move(IVec2::new(x, y), default_move_step);
                    self.wait = Some(TrackWait::Motion);
                }
                SequenceCommand::SetVisage(visage) => object.visage = visage,
                SequenceCommand::SetStrip(strip) => object.strip = strip,
                SequenceCommand::SetFrame(frame) => object.frame = frame.max(1),
                SequenceCommand::SetFrameCount(count) => object.frame_count = count.max(1),
                SequenceCommand::SetMoveStep { x, y } => object.move_step = Some(IVec2::new(x, y)),
                SequenceCommand::SetZoom(zoom) => object.zoom = zoom,
                SequenceCommand::FixPriority(priority) => object.priority = Some(priority),
                SequenceCommand::Show => object.visible = true,
                SequenceCommand::Hide => object.visible = false,
                SequenceCommand::Animate(mode) => object.animate(mode),
                SequenceCommand::AnimateAndWait(mode) => {
                    object.animate(mode);
                    if mode.is_finite() {
                        self.wait = Some(TrackWait::Animation);
                    } else {
                        log::warn!(
                            "Sequence {}: {:?} never ends, not waiting on it",
                            sequence,
                            mode
                        );
                    }
                }
                SequenceCommand::Delay(0) => {}
                SequenceCommand::Delay(ticks) => self.wait = Some(TrackWait::Delay(ticks)),
            }
            if self.wait.is_some() {
                return;
            }
        }

        self.done = true;
    }
}

/// One running sequence
#[derive(Debug, Clone)]
struct SequenceRun {
    sequence: u32,
    owner: Option<ActionId>,
    tracks: Vec<Track>,
}

/// Drives every running sequence of a scene
#[derive(Debug, Default)]
pub struct SequenceManager {
    runs: SlotMap<SequenceId, SequenceRun>,
    /// Start order, so runs tick deterministically
    order: Vec<SequenceId>,
}

impl SequenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a sequence; nothing runs until the next `tick`
    ///
    /// Extra participants beyond the descriptor's tracks are ignored.
    pub fn start(
        &mut self,
        table: &SequenceTable,
        sequence: u32,
        owner: Option<ActionId>,
        participants: &[ObjectId],
    ) -> Result<SequenceId, SequenceError> {
        let descriptor = table
            .get(sequence)
            .ok_or(SequenceError::UnknownSequence(sequence))?;
        if participants.len() < descriptor.participants.len() {
            return Err(SequenceError::MissingParticipant {
                sequence,
                expected: descriptor.participants.len(),
                actual: participants.len(),
            });
        }

        let tracks = descriptor
            .participants
            .iter()
            .zip(participants)
            .map(|(commands, object)| Track {
                object: *object,
                commands: commands.clone(),
                next: 0,
                wait: None,
                done: false,
            })
            .collect();

        let id = self.runs.insert(SequenceRun {
            sequence,
            owner,
            tracks,
        });
        self.order.push(id);
        log::debug!("Started sequence {} as {:?}", sequence, id);
        Ok(id)
    }

    /// Advance every run one tick, returns the runs that finished with their owner
    pub fn tick(
        &mut self,
        objects: &mut ObjectSet,
        default_move_step: IVec2,
    ) -> Vec<(SequenceId, Option<ActionId>)> {
        let mut finished = Vec::new();

        for id in &self.order {
            let Some(run) = self.runs.get_mut(*id) else {
                continue;
            };
            for track in &mut run.tracks {
                track.run(run.sequence, objects, default_move_step);
            }
            if run.tracks.iter().all(|track| track.done) {
                log::debug!("Sequence {} ({:?}) finished", run.sequence, id);
                finished.push((*id, run.owner));
            }
        }

        for (id, _) in &finished {
            self.runs.remove(*id);
        }
        let runs = &self.runs;
        self.order.retain(|id| runs.contains_key(*id));
        finished
    }

    /// Save every run in start order, paired with its live id
    ///
    /// `actions` maps live Action ids to their index in the same save.
    pub fn save(
        &self,
        objects: &ObjectSet,
        actions: &HashMap<ActionId, usize>,
    ) -> Vec<(SequenceId, SequenceSnapshot)> {
        self.order
            .iter()
            .filter_map(|id| self.runs.get(*id).map(|run| (*id, run)))
            .map(|(id, run)| {
                let tracks = run
                    .tracks
                    .iter()
                    .map(|track| TrackSnapshot {
                        participant: objects.get(track.object).map(|object| object.name.clone()),
                        next: track.next,
                        wait: track.wait,
                        done: track.done,
                    })
                    .collect();
                let saved = SequenceSnapshot {
                    sequence: run.sequence,
                    owner: run.owner.and_then(|owner| actions.get(&owner).copied()),
                    tracks,
                };
                (id, saved)
            })
            .collect()
    }

    /// Resume a saved run against the current descriptor table
    ///
    /// Command lists come from the table; the save only holds positions.
    pub fn restore_run(
        &mut self,
        table: &SequenceTable,
        saved: &SequenceSnapshot,
        owner: Option<ActionId>,
        objects: &ObjectSet,
    ) -> Result<SequenceId, SnapshotError> {
        let descriptor = table
            .get(saved.sequence)
            .ok_or(SnapshotError::UnknownSequence(saved.sequence))?;
        if descriptor.participants.len() != saved.tracks.len() {
            return Err(SnapshotError::SequenceMismatch(saved.sequence));
        }

        let mut tracks = Vec::with_capacity(saved.tracks.len());
        for (commands, track) in descriptor.participants.iter().zip(&saved.tracks) {
            if track.next > commands.len() {
                return Err(SnapshotError::SequenceMismatch(saved.sequence));
            }
            // A removed participant keeps a null id, which never resolves
            let object = match &track.participant {
                Some(name) => objects
                    .id(name)
                    .ok_or_else(|| SnapshotError::UnknownObject(name.clone()))?,
                None => ObjectId::default(),
            };
            tracks.push(Track {
                object,
                commands: commands.clone(),
                next: track.next,
                wait: track.wait,
                done: track.done,
            });
        }

        let id = self.runs.insert(SequenceRun {
            sequence: saved.sequence,
            owner,
            tracks,
        });
        self.order.push(id);
        Ok(id)
    }

    pub fn is_running(&self, id: SequenceId) -> bool {
        self.runs.contains_key(id)
    }

    /// Descriptor number of a running sequence
    pub fn sequence_of(&self, id: SequenceId) -> Option<u32> {
        self.runs.get(id).map(|run| run.sequence)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Drop every run (scene teardown)
    pub fn clear(&mut self) {
        self.runs.clear();
        self.order.clear();
    }
}
