//! Config - TOML 設定
//!
//! ```toml
//! [scheduler]
//! tick_interval_secs = 60
//!
//! [vault]
//! root = "."
//! task_prefix = "游戏/任务/"
//!
//! [manual]
//! fallback_hours = 24
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # 既定値
//! - すべてのフィールドに既定値がある。ファイルがなければ全部既定値
//! - `[manual]` セクションがなければフォールバックは 24 時間
//! - `[manual]` はあるが `fallback_hours` がなければ、入力を待ち続ける

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::DocumentId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// SchedulerConfig はスケジューラループの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

/// VaultLayout は vault 内のドキュメントの置き場所
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLayout {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_task_prefix")]
    pub task_prefix: String,
    #[serde(default = "default_character_path")]
    pub character_path: String,
    #[serde(default = "default_attribute_prefix")]
    pub attribute_prefix: String,
    #[serde(default = "default_resource_prefix")]
    pub resource_prefix: String,
    #[serde(default = "default_skill_prefix")]
    pub skill_prefix: String,
    #[serde(default = "default_completion_prefix")]
    pub completion_prefix: String,
}

/// ManualConfig は手動指定ポリシーのフォールバック
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualConfig {
    /// 答えのない手動指定タスクに、最後の完了から何時間後の刷新時刻を入れるか。
    /// None なら入力を待つ
    #[serde(default)]
    pub fallback_hours: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

/// Config はアプリケーション設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub vault: VaultLayout,
    #[serde(default)]
    pub manual: ManualConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_tick_interval_secs() -> u64 {
    60
}
fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_task_prefix() -> String {
    "游戏/任务/".into()
}
fn default_character_path() -> String {
    "游戏/角色.md".into()
}
fn default_attribute_prefix() -> String {
    "游戏/属性/".into()
}
fn default_resource_prefix() -> String {
    "游戏/资源/".into()
}
fn default_skill_prefix() -> String {
    "游戏/技能/".into()
}
fn default_completion_prefix() -> String {
    "游戏/完成记录/".into()
}
fn default_level() -> String {
    "info".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

impl Default for VaultLayout {
    fn default() -> Self {
        Self {
            root: default_root(),
            task_prefix: default_task_prefix(),
            character_path: default_character_path(),
            attribute_prefix: default_attribute_prefix(),
            resource_prefix: default_resource_prefix(),
            skill_prefix: default_skill_prefix(),
            completion_prefix: default_completion_prefix(),
        }
    }
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            fallback_hours: Some(24),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl VaultLayout {
    pub fn character(&self) -> DocumentId {
        DocumentId::new(self.character_path.clone())
    }

    pub fn attribute(&self, name: &str) -> DocumentId {
        DocumentId::new(format!("{}{name}.md", self.attribute_prefix))
    }

    pub fn resource(&self, name: &str) -> DocumentId {
        DocumentId::new(format!("{}{name}.md", self.resource_prefix))
    }

    pub fn skill(&self, name: &str) -> DocumentId {
        DocumentId::new(format!("{}{name}.md", self.skill_prefix))
    }

    pub fn completion_log(&self, task: &str) -> DocumentId {
        DocumentId::new(format!("{}{task}.md", self.completion_prefix))
    }
}

impl Config {
    /// `path` を読み込んで検証
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    /// `path` がなければ既定値
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn from_toml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "scheduler.tick_interval_secs",
                message: "must be at least 1".into(),
            });
        }
        if self.manual.fallback_hours == Some(0) {
            return Err(ConfigError::Invalid {
                key: "manual.fallback_hours",
                message: "must be at least 1 (omit it to wait for input)".into(),
            });
        }
        if self.vault.task_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "vault.task_prefix",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.scheduler.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.manual.fallback_hours, Some(24));
        assert_eq!(config.vault.character().as_str(), "游戏/角色.md");
        assert_eq!(config.vault.skill("笛子").as_str(), "游戏/技能/笛子.md");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str("[scheduler]\ntick_interval_secs = 5\n").unwrap();
        assert_eq!(config.scheduler.tick_interval_secs, 5);
        assert_eq!(config.vault, VaultLayout::default());
        assert_eq!(config.manual.fallback_hours, Some(24));
    }

    #[test]
    fn manual_section_without_fallback_waits_for_input() {
        let config: Config = toml::from_str("[manual]\n").unwrap();
        assert_eq!(config.manual.fallback_hours, None);
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = Config::default();
        config.manual.fallback_hours = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_or_default_handles_missing_and_present_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lifequest.toml");
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
        assert!(matches!(Config::load(&path), Err(ConfigError::Read { .. })));

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[vault]\nroot = \"/tmp/vault\"\n[logging]\nlevel = \"debug\"").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.vault.root, PathBuf::from("/tmp/vault"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scheduler\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn serialized_config_loads_back() {
        let text = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
