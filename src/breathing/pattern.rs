use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Inhale",
            PhaseKind::Hold => "Hold",
            PhaseKind::Exhale => "Exhale",
        }
    }

    /// Accepts full names and the short forms used on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inhale" | "in" | "i" => Some(PhaseKind::Inhale),
            "hold" | "h" => Some(PhaseKind::Hold),
            "exhale" | "out" | "ex" | "e" => Some(PhaseKind::Exhale),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration_secs: u32,
}

impl Phase {
    pub const fn new(kind: PhaseKind, duration_secs: u32) -> Self {
        Self {
            kind,
            duration_secs,
        }
    }
}

/// Named patterns offered by the session picker.
pub const PRESET_NAMES: [&str; 4] = ["calm", "box", "relax", "coherent"];

/// Ordered phases that repeat for the whole session.
///
/// Construction validates the pattern, so a `BreathingPattern` value always
/// has a positive cycle length. Zero-length phases are kept but never become
/// the current phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<Phase>", into = "Vec<Phase>")]
pub struct BreathingPattern {
    phases: Vec<Phase>,
}

impl BreathingPattern {
    pub fn new(phases: Vec<Phase>) -> Result<Self, ConfigError> {
        let pattern = Self { phases };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn from_pairs(pairs: &[(PhaseKind, u32)]) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .iter()
                .map(|&(kind, secs)| Phase::new(kind, secs))
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phases.is_empty() {
            return Err(ConfigError::EmptyPattern);
        }
        if self.cycle_secs() == 0 {
            return Err(ConfigError::ZeroLengthCycle);
        }
        Ok(())
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Total length of one cycle in seconds.
    pub fn cycle_secs(&self) -> u64 {
        self.phases
            .iter()
            .map(|phase| u64::from(phase.duration_secs))
            .sum()
    }

    /// 4s in, 2s hold, 6s out.
    pub fn calm() -> Self {
        Self {
            phases: vec![
                Phase::new(PhaseKind::Inhale, 4),
                Phase::new(PhaseKind::Hold, 2),
                Phase::new(PhaseKind::Exhale, 6),
            ],
        }
    }

    pub fn box_breathing() -> Self {
        Self {
            phases: vec![
                Phase::new(PhaseKind::Inhale, 4),
                Phase::new(PhaseKind::Hold, 4),
                Phase::new(PhaseKind::Exhale, 4),
                Phase::new(PhaseKind::Hold, 4),
            ],
        }
    }

    /// The 4-7-8 pattern.
    pub fn relax() -> Self {
        Self {
            phases: vec![
                Phase::new(PhaseKind::Inhale, 4),
                Phase::new(PhaseKind::Hold, 7),
                Phase::new(PhaseKind::Exhale, 8),
            ],
        }
    }

    pub fn coherent() -> Self {
        Self {
            phases: vec![
                Phase::new(PhaseKind::Inhale, 5),
                Phase::new(PhaseKind::Exhale, 5),
            ],
        }
    }

    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "calm" | "default" => Ok(Self::calm()),
            "box" | "square" => Ok(Self::box_breathing()),
            "relax" | "4-7-8" | "478" => Ok(Self::relax()),
            "coherent" | "resonant" => Ok(Self::coherent()),
            other => Err(ConfigError::UnknownPattern(other.to_string())),
        }
    }

    /// Parses either a preset name or the compact phase list form,
    /// e.g. `inhale:4,hold:2,exhale:6` or `i4 h2 e6`.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let trimmed = s.trim();
        if !trimmed.contains(|c: char| c.is_ascii_digit() || c == ':' || c == ',') {
            return Self::preset(trimmed);
        }
        if let Ok(pattern) = Self::preset(trimmed) {
            return Ok(pattern);
        }

        let phases = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(parse_phase)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(phases)
    }
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self::calm()
    }
}

impl FromStr for BreathingPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Vec<Phase>> for BreathingPattern {
    type Error = ConfigError;

    fn try_from(phases: Vec<Phase>) -> Result<Self, Self::Error> {
        Self::new(phases)
    }
}

impl From<BreathingPattern> for Vec<Phase> {
    fn from(pattern: BreathingPattern) -> Self {
        pattern.phases
    }
}

impl fmt::Display for BreathingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .phases
            .iter()
            .map(|phase| format!("{}:{}", phase.kind.as_str().to_lowercase(), phase.duration_secs))
            .collect();
        f.write_str(&parts.join(","))
    }
}

fn parse_phase(token: &str) -> Result<Phase, ConfigError> {
    let malformed = || ConfigError::MalformedPhase(token.to_string());

    let (kind, secs) = match token.split_once(':') {
        Some(parts) => parts,
        None => {
            let digits_at = token
                .find(|c: char| c.is_ascii_digit())
                .ok_or_else(malformed)?;
            token.split_at(digits_at)
        }
    };

    let kind = PhaseKind::parse(kind).ok_or_else(malformed)?;
    let duration_secs = secs.trim().parse::<u32>().map_err(|_| malformed())?;
    Ok(Phase::new(kind, duration_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_expected_cycles() {
        assert_eq!(BreathingPattern::calm().cycle_secs(), 12);
        assert_eq!(BreathingPattern::box_breathing().cycle_secs(), 16);
        assert_eq!(BreathingPattern::relax().cycle_secs(), 19);
        assert_eq!(BreathingPattern::coherent().cycle_secs(), 10);
        for name in PRESET_NAMES {
            assert!(BreathingPattern::preset(name).is_ok(), "preset {name}");
        }
    }

    #[test]
    fn test_preset_lookup_is_case_insensitive() {
        assert_eq!(
            BreathingPattern::preset("BOX").unwrap(),
            BreathingPattern::box_breathing()
        );
        assert_eq!(
            BreathingPattern::parse("4-7-8").unwrap(),
            BreathingPattern::relax()
        );
        assert_eq!(
            BreathingPattern::preset("zen"),
            Err(ConfigError::UnknownPattern("zen".to_string()))
        );
    }

    #[test]
    fn test_parse_long_and_short_forms() {
        let long: BreathingPattern = "inhale:4,hold:2,exhale:6".parse().unwrap();
        let short: BreathingPattern = "i4 h2 e6".parse().unwrap();
        assert_eq!(long, BreathingPattern::calm());
        assert_eq!(short, BreathingPattern::calm());
        assert_eq!(long.to_string(), "inhale:4,hold:2,exhale:6");
    }

    #[test]
    fn test_parse_rejects_malformed_phase() {
        assert_eq!(
            BreathingPattern::parse("inhale:4,sigh:2"),
            Err(ConfigError::MalformedPhase("sigh:2".to_string()))
        );
        assert_eq!(
            BreathingPattern::parse("inhale:x"),
            Err(ConfigError::MalformedPhase("inhale:x".to_string()))
        );
    }

    #[test]
    fn test_pattern_invariants() {
        assert_eq!(BreathingPattern::new(vec![]), Err(ConfigError::EmptyPattern));
        assert_eq!(
            BreathingPattern::from_pairs(&[(PhaseKind::Inhale, 0), (PhaseKind::Exhale, 0)]),
            Err(ConfigError::ZeroLengthCycle)
        );
        let with_zero_hold =
            BreathingPattern::from_pairs(&[(PhaseKind::Inhale, 3), (PhaseKind::Hold, 0)]).unwrap();
        assert_eq!(with_zero_hold.cycle_secs(), 3);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: BreathingPattern =
            serde_json::from_str(r#"[{"kind":"inhale","durationSecs":5},{"kind":"exhale","durationSecs":5}]"#)
                .unwrap();
        assert_eq!(ok, BreathingPattern::coherent());

        let err = serde_json::from_str::<BreathingPattern>("[]");
        assert!(err.is_err());
    }
}
