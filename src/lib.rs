// Cooperative, tick-driven Action scheduling for scripted scenes
//
// Layout:
// - `core`: integer stepping math
// - `engine`: tick clock, configuration, ids, errors, host requests
// - `scene`: objects, movers, animation, palette, the scene runtime
// - `script`: Actions, the scheduler, sequences, save/restore
// - `game`: the credits cutscene content

pub mod core;
pub mod engine;
pub mod game;
pub mod scene;
pub mod script;

pub use engine::{EngineConfig, HostRequest, TickClock};
pub use scene::{Director, Scene, SceneFactory, SceneObject};
pub use script::{ActionScript, Effect, SceneView, StepState, Target, Transition};
