//! Stateless mapping from breathing position to what the screen draws.
//!
//! The pulsing circle is a pure function of the current phase and how far
//! into it the session is; nothing here is stored on the controller.

use serde::Serialize;
use std::f32::consts::PI;

use super::pattern::PhaseKind;
use crate::session::SessionSnapshot;

pub const MIN_SCALE: f32 = 0.6;
pub const MAX_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreathVisual {
    pub scale: f32,
    pub color: Rgb,
    pub label: &'static str,
}

impl BreathVisual {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let progress = &snapshot.progress;
        breath_visual(
            progress.phase,
            progress.phase_elapsed_secs,
            progress.phase_duration_secs,
        )
    }
}

pub fn phase_color(phase: PhaseKind) -> Rgb {
    match phase {
        PhaseKind::Inhale => Rgb::new(94, 179, 237),
        PhaseKind::Hold => Rgb::new(149, 117, 205),
        PhaseKind::Exhale => Rgb::new(102, 187, 106),
    }
}

pub fn phase_label(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Inhale => "Breathe in",
        PhaseKind::Hold => "Hold",
        PhaseKind::Exhale => "Breathe out",
    }
}

pub fn breath_visual(phase: PhaseKind, phase_elapsed_secs: u32, phase_duration_secs: u32) -> BreathVisual {
    let t = if phase_duration_secs == 0 {
        1.0
    } else {
        (phase_elapsed_secs as f32 / phase_duration_secs as f32).clamp(0.0, 1.0)
    };
    let eased = 0.5 - 0.5 * (PI * t).cos();
    let span = MAX_SCALE - MIN_SCALE;

    let scale = match phase {
        PhaseKind::Inhale => MIN_SCALE + span * eased,
        PhaseKind::Hold => MAX_SCALE,
        PhaseKind::Exhale => MAX_SCALE - span * eased,
    };

    BreathVisual {
        scale,
        color: phase_color(phase),
        label: phase_label(phase),
    }
}

/// Formats seconds as `MM:SS`; minutes keep growing past an hour.
pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Text progress bar, `progress` in `0.0..=1.0`.
pub fn render_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inhale_grows_and_exhale_shrinks() {
        let start = breath_visual(PhaseKind::Inhale, 0, 4);
        let mid = breath_visual(PhaseKind::Inhale, 2, 4);
        assert!((start.scale - MIN_SCALE).abs() < 1e-6);
        assert!(mid.scale > start.scale && mid.scale < MAX_SCALE);

        let exhale_start = breath_visual(PhaseKind::Exhale, 0, 6);
        let exhale_late = breath_visual(PhaseKind::Exhale, 5, 6);
        assert!((exhale_start.scale - MAX_SCALE).abs() < 1e-6);
        assert!(exhale_late.scale < exhale_start.scale);
    }

    #[test]
    fn test_hold_is_full_and_labelled() {
        let hold = breath_visual(PhaseKind::Hold, 1, 2);
        assert_eq!(hold.scale, MAX_SCALE);
        assert_eq!(hold.label, "Hold");
        assert_eq!(hold.color.hex(), "#9575cd");
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(90), "01:30");
        assert_eq!(format_mmss(3600), "60:00");
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0.5, 4), "[██░░]");
        assert_eq!(render_bar(2.0, 3), "[███]");
        assert_eq!(render_bar(0.0, 2), "[░░]");
    }
}
