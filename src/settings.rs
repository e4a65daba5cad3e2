use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf, sync::RwLock};

use crate::breathing::BreathingPattern;
use crate::clock::ClockConfig;
use crate::error::ConfigError;
use crate::session::{SessionConfig, SoundscapeId};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// User preferences for new sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MindfulSettings {
    pub default_minutes: u32,
    /// Preset name or phase list, e.g. `calm` or `inhale:4,hold:2,exhale:6`.
    pub pattern: String,
    pub soundscape: String,
    pub tick_period_ms: u64,
}

impl Default for MindfulSettings {
    fn default() -> Self {
        Self {
            default_minutes: 10,
            pattern: "calm".into(),
            soundscape: SoundscapeId::silence().0,
            tick_period_ms: 1000,
        }
    }
}

impl MindfulSettings {
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let pattern = BreathingPattern::parse(&self.pattern)?;
        let config = SessionConfig::new(
            self.default_minutes.saturating_mul(60),
            pattern,
            SoundscapeId(self.soundscape.clone()),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            period: Duration::from_millis(self.tick_period_ms.max(1)),
            unit_secs: 1,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MindfulSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable as JSON.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("ignoring malformed settings at {}: {err}", path.display());
                MindfulSettings::default()
            })
        } else {
            MindfulSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> MindfulSettings {
        self.data
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn update(&self, settings: MindfulSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: MindfulSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &MindfulSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
