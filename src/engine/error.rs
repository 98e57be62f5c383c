// Error taxonomy
//
// Only malformed data and configuration problems surface as errors. Runtime
// degradations (unreachable targets, missing objects mid-script) are logged
// and recovered locally by the scene instead.

/// Errors raised by scene setup and object lookups
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("Unknown scene object: {0}")]
    UnknownObject(String),

    #[error("Scene object already exists: {0}")]
    DuplicateObject(String),

    #[error("No scene registered for id {0}")]
    UnknownScene(u32),
}

/// Precondition violations in sequence descriptors
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Unknown sequence id: {0}")]
    UnknownSequence(u32),

    #[error("Sequence {sequence} expects {expected} participants, got {actual}")]
    MissingParticipant {
        sequence: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Sequence {sequence}: participant {index} is not in the scene")]
    UnknownParticipant { sequence: u32, index: usize },

    #[error("Failed to parse sequence table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors while restoring saved Action state
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("No script registered for kind: {0}")]
    UnknownScript(String),

    #[error("Snapshot references unknown object: {0}")]
    UnknownObject(String),

    #[error("Snapshot entry {entry} waits on missing child {child}")]
    DanglingChild { entry: usize, child: usize },

    #[error("Snapshot entry {entry} waits on missing sequence run {run}")]
    DanglingSequence { entry: usize, run: usize },

    #[error("Saved sequence run {run} is owned by missing entry {owner}")]
    DanglingOwner { run: usize, owner: usize },

    #[error("Saved run of sequence {0} does not match its descriptor")]
    SequenceMismatch(u32),

    #[error("Snapshot references unknown sequence: {0}")]
    UnknownSequence(u32),

    #[error("Snapshot belongs to scene {saved}, not scene {current}")]
    SceneMismatch { saved: u32, current: u32 },

    #[error("Snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while loading engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
