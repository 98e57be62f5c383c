// Engine plumbing: tick clock, configuration, ids, errors, host requests

pub mod config;
pub mod error;
pub mod game_loop;
pub mod ids;
pub mod requests;

pub use config::EngineConfig;
pub use error::{ConfigError, SceneError, SequenceError, SnapshotError};
pub use game_loop::TickClock;
pub use ids::{ActionId, ObjectId, SequenceId};
pub use requests::{HostRequest, RequestQueue};
