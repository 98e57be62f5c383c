// Game content
//
// Scripted scenes built on the scene runtime. The credits sequence doubles
// as the demo played by the binary.

pub mod credits;

pub use credits::{script_registry, CreditsFactory};
