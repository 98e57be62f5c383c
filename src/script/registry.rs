// Script constructors by kind, used to rebuild Actions from a save

use std::collections::HashMap;

use super::action::ActionScript;
use crate::engine::error::SnapshotError;

/// Builds a fresh instance of one script kind
pub type ScriptConstructor = fn() -> Box<dyn ActionScript>;

fn construct<S: ActionScript + Default + 'static>() -> Box<dyn ActionScript> {
    Box::new(S::default())
}

/// Maps `ActionScript::kind` names to constructors
#[derive(Debug, Default, Clone)]
pub struct ScriptRegistry {
    constructors: HashMap<&'static str, ScriptConstructor>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a script type under the kind it reports
    pub fn register<S: ActionScript + Default + 'static>(&mut self) -> &mut Self {
        let kind = S::default().kind();
        self.register_with(kind, construct::<S>)
    }

    pub fn register_with(
        &mut self,
        kind: &'static str,
        constructor: ScriptConstructor,
    ) -> &mut Self {
        if self.constructors.insert(kind, constructor).is_some() {
            log::warn!("Script kind {} registered twice, keeping the latest", kind);
        }
        self
    }

    /// Create a script by kind name
    pub fn create(&self, kind: &str) -> Result<Box<dyn ActionScript>, SnapshotError> {
        self.constructors
            .get(kind)
            .map(|constructor| constructor())
            .ok_or_else(|| SnapshotError::UnknownScript(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}
