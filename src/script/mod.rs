// Scripting layer: resumable Actions, their scheduler and choreography

pub mod action;
pub mod registry;
pub mod scheduler;
pub mod sequence;
pub mod snapshot;
pub mod view;

pub use action::{
    ActionScript, Awaitable, Effect, Locals, Next, StepState, Target, Transition, LOCAL_SLOTS,
};
pub use registry::ScriptRegistry;
pub use scheduler::{Action, ActionScheduler, Resume, StepOutcome, WaitOn};
pub use sequence::{SequenceCommand, SequenceDescriptor, SequenceManager, SequenceTable};
pub use snapshot::{ActionSnapshot, SavedWait, SceneSnapshot};
pub use view::SceneView;
