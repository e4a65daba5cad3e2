pub mod engine;
pub mod pattern;
pub mod visual;

pub use engine::{position_at, BreathingCycleEngine, CyclePosition};
pub use pattern::{BreathingPattern, Phase, PhaseKind, PRESET_NAMES};
pub use visual::{breath_visual, BreathVisual};
