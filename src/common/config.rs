//! The `Config` the core consumes and the TOML loader that produces it.
//! Parsing the file is an ambient concern external to the core: the
//! reconciler never touches the filesystem, it only ever sees an
//! already-validated `Config` value delivered via `PlatformEvent::ConfigChanged`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub fn default_config_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".tessera.toml")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Bsp,
    Stack,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Padding {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FocusFollowsMouse {
    #[default]
    Off,
    Autofocus,
    Autoraise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BarPosition {
    #[default]
    Off,
    Main,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ExternalBar {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub position: BarPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfiguredSpace {
    pub name: String,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayKind {
    #[default]
    Builtin,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfiguredDisplay {
    pub label: String,
    #[serde(default)]
    pub kind: DisplayKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Below,
    Normal,
    Above,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub app_name_pattern: String,
    #[serde(default)]
    pub target_space_label: Option<String>,
    #[serde(default)]
    pub manage_override: Option<bool>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub layer: Option<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutKind,
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default = "default_split_ratio")]
    pub split_ratio: f64,
    #[serde(default)]
    pub auto_balance: bool,
    #[serde(default)]
    pub focus_follows_mouse: FocusFollowsMouse,
    #[serde(default)]
    pub mouse_follows_focus: bool,
    #[serde(default)]
    pub external_bar: ExternalBar,
    #[serde(default)]
    pub spaces: Vec<ConfiguredSpace>,
    #[serde(default)]
    pub displays: Vec<ConfiguredDisplay>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_gap() -> f64 { 8.0 }
fn default_split_ratio() -> f64 { 0.5 }

impl Default for Config {
    fn default() -> Self {
        Config {
            layout: LayoutKind::default(),
            gap: default_gap(),
            padding: Padding::default(),
            split_ratio: default_split_ratio(),
            auto_balance: false,
            focus_follows_mouse: FocusFollowsMouse::default(),
            mouse_follows_focus: false,
            external_bar: ExternalBar::default(),
            spaces: Vec::new(),
            displays: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Human-readable problems with this config; does not mutate.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(0.1..=0.9).contains(&self.split_ratio) {
            issues.push(format!(
                "split_ratio must be within [0.1, 0.9], got {}",
                self.split_ratio
            ));
        }
        if self.gap < 0.0 {
            issues.push(format!("gap must be non-negative, got {}", self.gap));
        }

        let mut seen_space_names = crate::common::collections::HashSet::default();
        for space in &self.spaces {
            if !seen_space_names.insert(space.name.as_str()) {
                issues.push(format!("duplicate configured space name '{}'", space.name));
            }
        }
        let mut seen_display_labels = crate::common::collections::HashSet::default();
        for display in &self.displays {
            if !seen_display_labels.insert(display.label.as_str()) {
                issues.push(format!("duplicate configured display label '{}'", display.label));
            }
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.app_name_pattern.is_empty() {
                issues.push(format!("rule {i} has an empty app_name_pattern"));
            }
            if let Some(opacity) = rule.opacity {
                if !(0.0..=1.0).contains(&opacity) {
                    issues.push(format!("rule {i} opacity must be within [0.0, 1.0], got {opacity}"));
                }
            }
        }
        issues
    }

    /// Repairs out-of-range values in place; returns the number of fixes
    /// applied. A config typo should never stop the daemon from booting.
    pub fn auto_fix(&mut self) -> usize {
        let mut fixes = 0;
        if !(0.1..=0.9).contains(&self.split_ratio) {
            self.split_ratio = self.split_ratio.clamp(0.1, 0.9);
            fixes += 1;
        }
        if self.gap < 0.0 {
            self.gap = default_gap();
            fixes += 1;
        }
        for rule in &mut self.rules {
            if let Some(opacity) = rule.opacity {
                if !(0.0..=1.0).contains(&opacity) {
                    rule.opacity = Some(opacity.clamp(0.0, 1.0));
                    fixes += 1;
                }
            }
        }
        fixes
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Parses `path`, auto-fixing out-of-range values and logging any
    /// issues found. Missing file yields `Config::default()`.
    pub fn load(path: &Path) -> Result<Config, ConfigLoadError> {
        if !path.exists() {
            tracing::info!(?path, "no config file found, using defaults");
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigLoadError::Io { path: path.to_owned(), source })?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|source| ConfigLoadError::Parse { path: path.to_owned(), source })?;

        let issues = config.validate();
        if !issues.is_empty() {
            for issue in &issues {
                tracing::warn!(%issue, "config issue");
            }
            let fixed = config.auto_fix();
            tracing::warn!(fixed, "auto-fixed config issues");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn auto_fix_clamps_split_ratio() {
        let mut c = Config { split_ratio: 1.5, ..Config::default() };
        assert_eq!(c.auto_fix(), 1);
        assert_eq!(c.split_ratio, 0.9);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tessera.toml");
        fs::write(
            &path,
            r#"
            layout = "bsp"
            gap = 12.0
            split_ratio = 0.6
            auto_balance = true
            focus_follows_mouse = "autoraise"
            mouse_follows_focus = true

            [padding]
            top = 20.0

            [external_bar]
            top = 24.0
            position = "main"

            [[spaces]]
            name = "code"
            display = "main"

            [[displays]]
            label = "main"
            kind = "builtin"

            [[rules]]
            app_name_pattern = "Terminal*"
            target_space_label = "code"
            "#,
        )
        .unwrap();
        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.gap, 12.0);
        assert_eq!(config.split_ratio, 0.6);
        assert!(config.auto_balance);
        assert_eq!(config.focus_follows_mouse, FocusFollowsMouse::Autoraise);
        assert_eq!(config.spaces.len(), 1);
        assert_eq!(config.displays.len(), 1);
        assert_eq!(config.rules.len(), 1);
    }
}
