use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::grid::{Pattern, RuleKind};
use crate::mapping::NoteAnchor;
use crate::sequencer::{Preset, SessionParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_size")]
    pub size: usize,
    #[serde(default = "EngineConfig::default_fill")]
    pub fill: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub pattern: Pattern,
    #[serde(default)]
    pub rule: RuleKind,
    #[serde(default)]
    pub anchor: NoteAnchor,
}

impl EngineConfig {
    fn default_size() -> usize {
        16
    }
    fn default_fill() -> f64 {
        0.1
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            size: Self::default_size(),
            fill: Self::default_fill(),
            seed: None,
            pattern: Pattern::default(),
            rule: RuleKind::default(),
            anchor: NoteAnchor::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionParams,
    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
}

impl AppConfig {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Missing file means defaults; an unreadable or malformed one is
    /// reported and also falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("{err}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn preset(&self, name: &str) -> Result<&Preset, ConfigError> {
        self.presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lifeseq-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_empty_config_is_default() {
        let cfg = AppConfig::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.engine.size, 16);
        assert_eq!(cfg.session.delay_ms, 100.0);
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
            [engine]
            size = 8
            pattern = "glider"
            rule = "soft"
            anchor = "a440"
            seed = 7

            [session]
            heat = 0.25

            [presets.drone]
            damping = 0.0
            delay_ms = 400.0
        "#;
        let cfg = AppConfig::parse(text, Path::new("inline.toml")).unwrap();
        assert_eq!(cfg.engine.size, 8);
        assert_eq!(cfg.engine.fill, 0.1);
        assert_eq!(cfg.engine.pattern, Pattern::Glider);
        assert_eq!(cfg.engine.rule, RuleKind::Soft);
        assert_eq!(cfg.engine.anchor, NoteAnchor::A440);
        assert_eq!(cfg.engine.seed, Some(7));
        assert_eq!(cfg.session.heat, 0.25);
        assert_eq!(cfg.session.root_note, 44.0);

        let drone = cfg.preset("drone").unwrap();
        assert_eq!(drone.damping, Some(0.0));
        assert_eq!(drone.heat, None);
    }

    #[test]
    fn test_unknown_preset() {
        let cfg = AppConfig::default();
        assert!(matches!(
            cfg.preset("nope"),
            Err(ConfigError::UnknownPreset(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = AppConfig::parse("[engine]\nsize = \"big\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_path("missing.toml");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Io { .. })));
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut cfg = AppConfig::default();
        cfg.engine.size = 12;
        cfg.session.multiplier = 3.0;
        cfg.presets.insert(
            "hot".to_string(),
            Preset {
                heat: Some(0.5),
                ..Preset::default()
            },
        );

        let path = temp_path("restore.toml");
        fs::write(&path, cfg.to_toml().unwrap()).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let path = temp_path("malformed.toml");
        fs::write(&path, "this is not toml = = =").unwrap();
        let cfg = AppConfig::load_or_default(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }
}
