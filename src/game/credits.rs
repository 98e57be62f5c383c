// Credits cutscene
//
// Four scenes played back to back: motorcycle training (200), car training
// (210), the graduation article (265) and the first day at home (190), which
// is where the credits end.

use std::sync::Arc;

use glam::IVec2;

use crate::core::Rect;
use crate::engine::config::EngineConfig;
use crate::engine::error::{SceneError, SequenceError};
use crate::engine::requests::HostRequest;
use crate::scene::{AnimMode, Scene, SceneFactory, SceneObject};
use crate::script::action::{ActionScript, Effect, StepState, Target, Transition};
use crate::script::registry::ScriptRegistry;
use crate::script::sequence::SequenceTable;
use crate::script::view::SceneView;

pub const MOTORCYCLE_TRAINING: u32 = 200;
pub const CAR_TRAINING: u32 = 210;
pub const GRADUATION_ARTICLE: u32 = 265;
pub const FIRST_DAY: u32 = 190;

/// Credits music, started with the first scene
pub const CREDITS_MUSIC: u32 = 3;

const TRAINING_PALETTE: u32 = 235;
const ARTICLE_PALETTE: u32 = 2;

/// Sequence descriptors shipped with the demo
pub const CREDITS_SEQUENCES: &str = include_str!("../../assets/credits_sequences.json");

/// Number of times the instructor demonstrates before the riders go
const DEMONSTRATIONS: i32 = 2;

fn shimmer() -> [Effect; 2] {
    [
        Effect::AddRotation {
            start: 64,
            end: 79,
            delay: 10,
        },
        Effect::AddRotation {
            start: 96,
            end: 111,
            delay: 10,
        },
    ]
}

fn extras(prefix: &str) -> Vec<Target> {
    (1..=6).map(|n| Target::Named(format!("{prefix}{n}"))).collect()
}

/// Instructor demonstrates twice, waking the trainee after the first run,
/// then the riders cross the screen
#[derive(Debug, Default)]
pub struct TrainingIntro;

impl ActionScript for TrainingIntro {
    fn kind(&self) -> &'static str {
        "training_intro"
    }

    fn transition(&self, state: &StepState, _: &SceneView<'_>) -> Transition {
        match state.step {
            0 => Transition::delay(1),
            1 => Transition::delay(30)
                .with(Effect::Request(HostRequest::LoadPalette(TRAINING_PALETTE)))
                .with_locals(state.locals.with(0, 0)),
            2 => Transition::wait_animation(Target::Owner)
                .with(Effect::Animate(Target::Owner, AnimMode::ToEnd)),
            3 => {
                let demonstrations = state.locals.get(0) + 1;
                let locals = state.locals.with(0, demonstrations);
                if demonstrations < DEMONSTRATIONS {
                    Transition::delay(2)
                        .with(Effect::Signal(Target::named("trainee")))
                        .with(Effect::SetFrame(Target::Owner, 1))
                        .rewind_to(2)
                        .with_locals(locals)
                } else {
                    Transition::delay(2).with_locals(locals)
                }
            }
            4 => {
                let mut transition = Transition::wait_sequence();
                for effect in shimmer() {
                    transition = transition.with(effect);
                }
                transition.with(Effect::StartSequence {
                    id: 201,
                    participants: extras("rider"),
                })
            }
            _ => Transition::complete().with(Effect::ChangeScene(CAR_TRAINING)),
        }
    }
}

/// Trainee copies the instructor each time it is woken
#[derive(Debug, Default)]
pub struct TraineeCopy;

impl ActionScript for TraineeCopy {
    fn kind(&self) -> &'static str {
        "trainee_copy"
    }

    fn transition(&self, state: &StepState, _: &SceneView<'_>) -> Transition {
        match state.step {
            0 => Transition::idle(),
            1 => Transition::wait_animation(Target::Owner)
                .with(Effect::Animate(Target::Owner, AnimMode::ToEnd)),
            // Back to rest, ready for the next wake-up
            _ => Transition::idle()
                .with(Effect::SetFrame(Target::Owner, 1))
                .rewind_to(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct CarTrainingIntro;

impl ActionScript for CarTrainingIntro {
    fn kind(&self) -> &'static str {
        "car_training_intro"
    }

    fn transition(&self, state: &StepState, _: &SceneView<'_>) -> Transition {
        match state.step {
            0 => Transition::delay(1),
            1 => Transition::wait_animation(Target::Owner)
                .with(Effect::Animate(Target::Owner, AnimMode::ToEnd)),
            2 => {
                let mut transition = Transition::wait_sequence();
                for effect in shimmer() {
                    transition = transition.with(effect);
                }
                transition.with(Effect::StartSequence {
                    id: 210,
                    participants: extras("car"),
                })
            }
            _ => Transition::complete()
                .with(Effect::ClearRotations)
                .with(Effect::ChangeScene(GRADUATION_ARTICLE)),
        }
    }
}

/// Shows the article, walks the player off screen and waits for the music
#[derive(Debug, Default)]
pub struct GraduationArticle;

impl GraduationArticle {
    const EXIT: IVec2 = IVec2::new(160, 280);
}

impl ActionScript for GraduationArticle {
    fn kind(&self) -> &'static str {
        "graduation_article"
    }

    fn transition(&self, state: &StepState, scene: &SceneView<'_>) -> Transition {
        let player = Target::named("player");
        match state.step {
            0 => Transition::delay(30)
                .with(Effect::Request(HostRequest::LoadPalette(ARTICLE_PALETTE))),
            1 => Transition::delay(240),
            2 if scene.can_reach(&player, Self::EXIT) => {
                Transition::wait_motion(player.clone()).with(Effect::MoveTo(player, Self::EXIT))
            }
            // The exit lies outside the walk area, so place the player there
            2 => Transition::delay(1).with(Effect::SetPosition(player, Self::EXIT)),
            3 if scene.is_sound_playing(CREDITS_MUSIC) => Transition::delay(1).rewind_to(3),
            3 => Transition::delay(1),
            _ => Transition::complete().with(Effect::ChangeScene(FIRST_DAY)),
        }
    }
}

/// Registry of every credits script, for restoring saves
pub fn script_registry() -> ScriptRegistry {
    let mut registry = ScriptRegistry::new();
    registry
        .register::<TrainingIntro>()
        .register::<TraineeCopy>()
        .register::<CarTrainingIntro>()
        .register::<GraduationArticle>();
    registry
}

/// Builds the credits scenes
#[derive(Debug, Clone)]
pub struct CreditsFactory {
    table: Arc<SequenceTable>,
}

impl CreditsFactory {
    pub fn new() -> Result<Self, SequenceError> {
        Ok(Self::with_table(SequenceTable::from_json_str(CREDITS_SEQUENCES)?))
    }

    pub fn with_table(table: SequenceTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    fn add_hidden_extras(scene: &mut Scene, prefix: &str) -> Result<(), SceneError> {
        for n in 1..=6 {
            scene.add_object(SceneObject::new(&format!("{prefix}{n}")).hidden())?;
        }
        Ok(())
    }

    fn motorcycle_training(&self, config: &EngineConfig) -> Result<Scene, SceneError> {
        let mut scene = Scene::new(MOTORCYCLE_TRAINING, config.clone(), Arc::clone(&self.table));
        scene.requests_mut().push(HostRequest::PlaySound(CREDITS_MUSIC));

        scene.add_object(
            SceneObject::new("instructor")
                .at(114, 102)
                .with_visage(200)
                .with_strip(2)
                .with_frame_count(4),
        )?;
        Self::add_hidden_extras(&mut scene, "rider")?;
        scene.add_object(
            SceneObject::new("trainee")
                .at(96, 112)
                .with_visage(200)
                .with_strip(3)
                .with_frame_count(4)
                .with_priority(1000),
        )?;

        scene.start_action("instructor", Box::new(TrainingIntro))?;
        scene.start_action("trainee", Box::new(TraineeCopy))?;
        Ok(scene)
    }

    fn car_training(&self, config: &EngineConfig) -> Result<Scene, SceneError> {
        let mut scene = Scene::new(CAR_TRAINING, config.clone(), Arc::clone(&self.table));
        scene.requests_mut().push(HostRequest::LoadPalette(TRAINING_PALETTE));

        scene.add_object(
            SceneObject::new("car")
                .at(146, 151)
                .with_visage(210)
                .with_frame_count(5),
        )?;
        Self::add_hidden_extras(&mut scene, "car")?;
        scene.start_action("car", Box::new(CarTrainingIntro))?;
        Ok(scene)
    }

    fn graduation_article(&self, config: &EngineConfig) -> Result<Scene, SceneError> {
        let mut scene = Scene::new(GRADUATION_ARTICLE, config.clone(), Arc::clone(&self.table));
        scene.stage_mut().walk.add(1, Rect::new(0, 0, 320, 200));
        scene.add_object(SceneObject::new("player").at(160, 100).hidden())?;
        scene.start_scene_action(Box::new(GraduationArticle));
        Ok(scene)
    }
}

impl SceneFactory for CreditsFactory {
    fn build(
        &self,
        scene: u32,
        previous: Option<u32>,
        config: &EngineConfig,
    ) -> Result<Scene, SceneError> {
        log::debug!("Building scene {} (from {:?})", scene, previous);
        match scene {
            MOTORCYCLE_TRAINING => self.motorcycle_training(config),
            CAR_TRAINING => self.car_training(config),
            GRADUATION_ARTICLE => self.graduation_article(config),
            FIRST_DAY => Ok(Scene::new(FIRST_DAY, config.clone(), Arc::clone(&self.table))),
            other => Err(SceneError::UnknownScene(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Director;
    use crate::script::scheduler::WaitOn;
    use crate::script::snapshot::SceneSnapshot;

    fn config() -> EngineConfig {
        EngineConfig::default().with_strict(true)
    }

    /// Tick a scene until it asks for a change, returns the tick and target
    fn run_until_change(scene: &mut Scene, limit: u32) -> Option<(u64, u32)> {
        for _ in 0..limit {
            scene.tick();
            if let Some(next) = scene.take_scene_change() {
                return Some((scene.current_tick(), next));
            }
        }
        None
    }

    #[test]
    fn test_sequence_table_parses() {
        let table = SequenceTable::from_json_str(CREDITS_SEQUENCES).expect("bundled sequences");
        assert_eq!(table.get(201).map(|d| d.participants.len()), Some(6));
        assert_eq!(table.get(210).map(|d| d.participants.len()), Some(6));
    }

    #[test]
    fn test_motorcycle_training_plays_through() {
        let factory = CreditsFactory::new().expect("factory");
        let mut scene = factory.build(MOTORCYCLE_TRAINING, None, &config()).expect("scene");
        assert_eq!(scene.drain_requests(), vec![HostRequest::PlaySound(CREDITS_MUSIC)]);

        let (_, next) = run_until_change(&mut scene, 2000).expect("scene finishes");
        assert_eq!(next, CAR_TRAINING);
        assert_eq!(scene.palette().rotations().len(), 2);

        // The trainee copied once and is parked again, ready to be woken
        let trainee = scene
            .object("trainee")
            .and_then(SceneObject::action)
            .and_then(|id| scene.scheduler().get(id))
            .map(|action| (action.step(), action.waiting()));
        assert_eq!(trainee, Some((1, Some(WaitOn::Signal))));
        assert_eq!(scene.object("trainee").map(|o| o.frame), Some(1));

        // Riders crossed and hid again
        assert_eq!(
            scene.object("rider1").map(|o| (o.position, o.visible)),
            Some((IVec2::new(340, 150), false))
        );
    }

    #[test]
    fn test_article_falls_back_and_waits_for_music() {
        let factory = CreditsFactory::new().expect("factory");
        let mut scene = factory
            .build(GRADUATION_ARTICLE, Some(CAR_TRAINING), &config())
            .expect("scene");
        scene.set_sound_playing(CREDITS_MUSIC, true);

        assert!(run_until_change(&mut scene, 400).is_none());
        assert_eq!(
            scene.object("player").map(|o| o.position),
            Some(GraduationArticle::EXIT),
            "Unreachable exit is reached by placing the player"
        );

        scene.set_sound_playing(CREDITS_MUSIC, false);
        let (_, next) = run_until_change(&mut scene, 5).expect("music stopped");
        assert_eq!(next, FIRST_DAY);
    }

    #[test]
    fn test_full_credits_run() {
        let factory = CreditsFactory::new().expect("factory");
        let mut director =
            Director::new(factory, config(), MOTORCYCLE_TRAINING).expect("first scene");

        let mut visited = vec![director.scene().id()];
        for _ in 0..5000 {
            director.tick().expect("tick");
            if visited.last() != Some(&director.scene().id()) {
                visited.push(director.scene().id());
            }
            if director.scene().id() == FIRST_DAY {
                break;
            }
        }
        assert_eq!(visited, vec![MOTORCYCLE_TRAINING, CAR_TRAINING, GRADUATION_ARTICLE, FIRST_DAY]);
        assert!(director
            .drain_requests()
            .contains(&HostRequest::LoadPalette(ARTICLE_PALETTE)));
    }

    #[test]
    fn test_restored_save_replays_identically() {
        let factory = CreditsFactory::new().expect("factory");
        let mut live = factory.build(MOTORCYCLE_TRAINING, None, &config()).expect("scene");
        for _ in 0..10 {
            live.tick();
        }
        let json = live.snapshot().to_json().expect("serialize");

        let saved = SceneSnapshot::from_json(&json).expect("parse");
        let mut restored = factory.build(MOTORCYCLE_TRAINING, None, &config()).expect("scene");
        restored.restore(&saved, &script_registry()).expect("restore");

        let expected = run_until_change(&mut live, 2000).expect("live scene finishes");
        let replayed = run_until_change(&mut restored, 2000).expect("restored finishes");
        assert_eq!(replayed, expected);
    }

    #[test]
    fn test_save_while_riders_cross_replays_identically() {
        let factory = CreditsFactory::new().expect("factory");
        let mut live = factory.build(MOTORCYCLE_TRAINING, None, &config()).expect("scene");
        let riders_running = |scene: &Scene| {
            scene
                .object("instructor")
                .and_then(SceneObject::action)
                .and_then(|id| scene.scheduler().get(id))
                .and_then(|action| action.waiting())
                .is_some_and(|wait| matches!(wait, WaitOn::Sequence(_)))
        };
        for _ in 0..2000 {
            if riders_running(&live) {
                break;
            }
            live.tick();
        }
        assert!(riders_running(&live), "Instructor never starts the riders");
        for _ in 0..5 {
            live.tick();
        }

        let json = live.snapshot().to_json().expect("serialize");
        let saved = SceneSnapshot::from_json(&json).expect("parse");
        let mut restored = factory.build(MOTORCYCLE_TRAINING, None, &config()).expect("scene");
        restored.restore(&saved, &script_registry()).expect("restore");
        assert_eq!(restored.sequences().len(), 1);
        assert!(riders_running(&restored));
        assert_eq!(
            restored.object("rider1").map(|o| o.position),
            live.object("rider1").map(|o| o.position)
        );

        let expected = run_until_change(&mut live, 2000).expect("live scene finishes");
        let replayed = run_until_change(&mut restored, 2000).expect("restored finishes");
        assert_eq!(replayed, expected);
        for n in 1..=6 {
            let name = format!("rider{n}");
            assert_eq!(
                restored.object(&name).map(|o| (o.position, o.visible)),
                live.object(&name).map(|o| (o.position, o.visible))
            );
        }
        assert_eq!(restored.palette().rotations(), live.palette().rotations());
    }
}
