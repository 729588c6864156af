use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StmtError};
use crate::models::Issuer;

/// A card identifier as printed in the statement and the name it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMarker {
    pub identifier: String,
    pub card: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_card_markers")]
    pub card_markers: Vec<CardMarker>,
    #[serde(default = "default_section_header")]
    pub section_header: String,
}

fn default_start_year() -> i32 {
    2023
}

pub fn default_card_markers() -> Vec<CardMarker> {
    vec![
        CardMarker {
            identifier: "4501XXXXXXXX1003".to_string(),
            card: "Sapphiro".to_string(),
        },
        CardMarker {
            identifier: "6528XXXXXXXX2001".to_string(),
            card: "Coral".to_string(),
        },
    ]
}

fn default_section_header() -> String {
    "TRANSACTIONS FOR ROHIT KUMAR".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            start_year: default_start_year(),
            card_markers: default_card_markers(),
            section_header: default_section_header(),
        }
    }
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Where statements for an issuer are dropped: `<data_dir>/<issuer key>`.
    pub fn input_dir(&self, issuer: Issuer) -> PathBuf {
        self.data_dir().join(issuer.key())
    }

    /// Where per-issuer workbooks, merged workbooks and the processed log live.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir().join("excel")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stmerge")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("statements")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring malformed settings at {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| StmtError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            start_year: 2021,
            card_markers: vec![CardMarker {
                identifier: "1111".to_string(),
                card: "Gold".to_string(),
            }],
            section_header: "TRANSACTIONS FOR JANE DOE".to_string(),
        };
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.start_year, 2021);
        assert_eq!(loaded.card_markers[0].card, "Gold");
        assert_eq!(loaded.section_header, "TRANSACTIONS FOR JANE DOE");
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s.start_year, 2023);
        assert_eq!(s.card_markers.len(), 2);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.start_year, 2023);
        assert_eq!(s.section_header, "TRANSACTIONS FOR ROHIT KUMAR");
        assert_eq!(s.card_markers, default_card_markers());
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_from(&path).start_year, 2023);
    }

    #[test]
    fn test_directory_layout() {
        let s = Settings {
            data_dir: "/data".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.input_dir(Issuer::Sbi), PathBuf::from("/data/sbi"));
        assert_eq!(s.output_dir(), PathBuf::from("/data/excel"));
    }
}
