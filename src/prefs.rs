//! Persisted interface preferences: language and colour theme.
//!
//! Stored as JSON at `<config dir>/nolimitpdf/preferences.json`. A missing
//! file is not an error; defaults come from the environment instead.

use crate::error::NolimitError;
use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

/// Interface preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

impl Preferences {
    /// Default location of the preferences file, if the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("nolimitpdf").join("preferences.json"))
    }

    /// Defaults derived from `LANG` and `NOLIMITPDF_THEME`.
    pub fn from_env() -> Self {
        let language = std::env::var("LANG")
            .map(|l| Language::from_locale(&l))
            .unwrap_or_default();
        let theme = std::env::var("NOLIMITPDF_THEME")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default();
        Self { language, theme }
    }

    /// Load from `path`, falling back to [`Preferences::from_env`] when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self, NolimitError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}; using defaults", path.display());
                return Ok(Self::from_env());
            }
            Err(e) => return Err(prefs_error(path, e)),
        };
        serde_json::from_str(&text).map_err(|e| prefs_error(path, e))
    }

    /// Write to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), NolimitError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| prefs_error(path, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| prefs_error(path, e))?;
        std::fs::write(path, json).map_err(|e| prefs_error(path, e))?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}

fn prefs_error(path: &Path, e: impl fmt::Display) -> NolimitError {
    NolimitError::Preferences {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}
