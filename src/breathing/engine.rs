use serde::Serialize;

use super::pattern::{BreathingPattern, PhaseKind};

/// Where a cursor lands inside the repeating pattern.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CyclePosition {
    pub phase: PhaseKind,
    /// Always `< phase_duration_secs`.
    pub phase_elapsed_secs: u32,
    pub phase_duration_secs: u32,
    /// Full cycles completed before the cursor.
    pub cycle_index: u64,
}

/// Maps a cursor (seconds since session start) onto the pattern.
///
/// Phase boundaries are inclusive on entry and exclusive on exit: an offset
/// equal to a phase's end already belongs to the next phase.
pub fn position_at(pattern: &BreathingPattern, cursor_secs: u64) -> CyclePosition {
    let cycle = pattern.cycle_secs();
    let first = pattern
        .phases()
        .iter()
        .find(|phase| phase.duration_secs > 0)
        .copied();

    let Some(first) = first else {
        // Unreachable for a validated pattern.
        return CyclePosition {
            phase: PhaseKind::Inhale,
            phase_elapsed_secs: 0,
            phase_duration_secs: 0,
            cycle_index: 0,
        };
    };

    let cycle_index = cursor_secs / cycle;
    let mut offset = cursor_secs % cycle;

    for phase in pattern.phases() {
        let duration = u64::from(phase.duration_secs);
        if offset < duration {
            return CyclePosition {
                phase: phase.kind,
                phase_elapsed_secs: offset as u32,
                phase_duration_secs: phase.duration_secs,
                cycle_index,
            };
        }
        offset -= duration;
    }

    // offset < cycle, so the walk above always returns.
    CyclePosition {
        phase: first.kind,
        phase_elapsed_secs: 0,
        phase_duration_secs: first.duration_secs,
        cycle_index: cycle_index + 1,
    }
}

/// Tracks the breathing position as session time accumulates.
#[derive(Debug, Clone)]
pub struct BreathingCycleEngine {
    pattern: BreathingPattern,
    cursor_secs: u64,
    position: CyclePosition,
}

impl BreathingCycleEngine {
    pub fn new(pattern: BreathingPattern) -> Self {
        let position = position_at(&pattern, 0);
        Self {
            pattern,
            cursor_secs: 0,
            position,
        }
    }

    pub fn advance(&mut self, tick_secs: u32) -> CyclePosition {
        self.cursor_secs = self.cursor_secs.saturating_add(u64::from(tick_secs));
        self.position = position_at(&self.pattern, self.cursor_secs);
        self.position
    }

    pub fn position(&self) -> CyclePosition {
        self.position
    }

    pub fn cursor_secs(&self) -> u64 {
        self.cursor_secs
    }

    pub fn pattern(&self) -> &BreathingPattern {
        &self.pattern
    }
}
