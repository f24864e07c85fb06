use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    profile::EngineProfile,
    tree::{Classifier, Direction, Tag},
};

pub const NBSP: &str = "\u{a0}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Tag used for paragraph wrappers synthesized around loose inline content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    #[default]
    Div,
    P,
}

impl BlockMode {
    pub fn tag(self) -> Tag {
        match self {
            BlockMode::Div => Tag::Div,
            BlockMode::P => Tag::P,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidiConfig {
    pub profile: EngineProfile,
    pub block_mode: BlockMode,
    pub root_direction: Direction,
    /// Text put into a wrapper that would otherwise collapse.
    pub placeholder: String,
    /// Give every imported paragraph the direction of its first strong character.
    pub auto_direction: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<Classifier>,
}

impl Default for BidiConfig {
    fn default() -> Self {
        Self {
            profile: EngineProfile::default(),
            block_mode: BlockMode::default(),
            root_direction: Direction::Ltr,
            placeholder: NBSP.to_string(),
            auto_direction: true,
            classifier: None,
        }
    }
}

impl BidiConfig {
    pub fn with_profile(mut self, profile: EngineProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_block_mode(mut self, block_mode: BlockMode) -> Self {
        self.block_mode = block_mode;
        self
    }

    pub fn with_root_direction(mut self, direction: Direction) -> Self {
        self.root_direction = direction;
        self
    }

    pub fn classifier(&self) -> Classifier {
        self.classifier.clone().unwrap_or_default()
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: config_path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded bidi config from {}", config_path.display());
        Ok(Some(config))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");
        assert!(BidiConfig::load_from_path(&path).unwrap().is_none());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bidi.toml");
        std::fs::write(
            &path,
            "profile = \"merge-prone-list\"\nblock_mode = \"p\"\nroot_direction = \"rtl\"\n",
        )
        .unwrap();

        let config = BidiConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(config.profile, EngineProfile::MergeProneList);
        assert_eq!(config.block_mode, BlockMode::P);
        assert_eq!(config.root_direction, Direction::Rtl);
        assert_eq!(config.placeholder, NBSP);
        assert_eq!(config.classifier(), Classifier::default());
    }

    #[test]
    fn classifier_override_is_read_by_tag_name() {
        let content = r#"
[classifier]
line_text = ["div", "p", "li"]
line_styled = ["p"]
table_containers = ["table", "tr"]
block_containers = ["ul", "ol"]
"#;
        let config: BidiConfig = toml::from_str(content).unwrap();
        let classifier = config.classifier();
        assert!(classifier.line_text.contains(&Tag::Li));
        assert!(!classifier.line_text.contains(&Tag::Td));
        assert!(!classifier.block_containers.contains(&Tag::Table));
    }

    #[test]
    fn bad_toml_reports_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bidi.toml");
        std::fs::write(&path, "profile = \"gecko\"").unwrap();

        let err = BidiConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("bidi.toml");
        let config = BidiConfig::default().with_profile(EngineProfile::LegacyList);
        config.save_to_path(&path).unwrap();

        let loaded = BidiConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }
}
