use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AssistantError, Result};

pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("lucy")
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct LucyConfig {
    /// Wake word the recognizer listens for.
    pub trigger_word: String,
    /// Daily summary time, "HH:mm".
    pub summary_time: String,
    /// Program used to hand `<name>:` URIs to the desktop.
    pub opener_command: String,
    /// Shell command printing recognized utterances, one per line. Empty disables voice.
    pub recognizer_command: String,
    pub model: String,
    pub seed_sample_events: bool,
    pub debug_logging: bool,
}

impl Default for LucyConfig {
    fn default() -> Self {
        Self {
            trigger_word: "lucy".into(),
            summary_time: "08:00".into(),
            opener_command: "xdg-open".into(),
            recognizer_command: String::new(),
            model: DEFAULT_MODEL.into(),
            seed_sample_events: true,
            debug_logging: false,
        }
    }
}

impl LucyConfig {
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    /// Load from `path`, falling back to defaults when missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| AssistantError::Config(format!("{}: {}", dir.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| AssistantError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn voice_enabled(&self) -> bool {
        !self.recognizer_command.trim().is_empty()
    }
}
