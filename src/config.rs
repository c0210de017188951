use crate::model::{Priority, DEFAULT_CATEGORY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown theme: {0} (expected light or dark)")]
pub struct UnknownTheme(String);

/// User preferences stored in `settings.yml` beside the task file. Every
/// field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub default_category: String,
    pub default_priority: Priority,
    /// Offered by the TUI category filter even before any task uses them.
    pub categories: Vec<String>,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: Theme::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
            default_priority: Priority::default(),
            categories: vec![DEFAULT_CATEGORY.to_string(), "Work".to_string()],
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Settings::default(),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read settings, using defaults"
                );
                return Settings::default();
            }
        };
        if data.trim().is_empty() {
            return Settings::default();
        }
        serde_yaml::from_str(&data).unwrap_or_else(|err| {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to parse settings, using defaults"
            );
            Settings::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_yaml::to_string(self).context("serializing settings")?;
        fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_or_broken_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yml");
        assert_eq!(Settings::load(&path), Settings::default());

        fs::write(&path, "theme: [sepia").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yml");
        fs::write(&path, "theme: dark\n").unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.default_category, "Personal");
        assert_eq!(settings.default_priority, Priority::Medium);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.yml");
        let settings = Settings {
            theme: Theme::Dark,
            default_category: "Work".into(),
            default_priority: Priority::High,
            categories: vec!["Work".into(), "Errands".into()],
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn theme_toggles_and_parses() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!("DARK".parse::<Theme>(), Ok(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
    }
}
