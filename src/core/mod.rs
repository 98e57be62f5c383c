// Core math utilities

pub mod math;

pub use math::{step_toward, step_toward_axes, Rect};
