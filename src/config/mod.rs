//! Configuration management for WebTerm
//!
//! Configuration is loaded from, in order:
//! 1. Embedded default_config.toml (compile-time defaults)
//! 2. User config at ~/.config/webterm/config.toml (or platform-specific location)
//! 3. Project-local config at ./.webterm/config.toml

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color::{AnsiColor, AnsiPalette, Rgb};
use crate::error::{ConfigError, ConfigResult};
use crate::terminal::style::Theme;
use crate::transport::ReconnectPolicy;

/// Default configuration embedded in binary
const DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default = "default_max_output_lines")]
    pub max_output_lines: usize,
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold_px: f64,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            max_output_lines: default_max_output_lines(),
            scroll_threshold_px: default_scroll_threshold(),
            prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_size")]
    pub max_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_history_size(),
        }
    }
}

/// Shell connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay")]
    pub max_reconnect_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_interval_ms: default_reconnect_interval(),
            max_reconnect_attempts: default_reconnect_attempts(),
            max_reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

impl TransportConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect_interval_ms),
            max_attempts: self.max_reconnect_attempts,
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
        }
    }
}

/// Theme colors and palette overrides, all as `#rrggbb`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppearanceConfig {
    #[serde(default = "default_foreground")]
    pub foreground: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_foreground")]
    pub cursor: String,
    #[serde(default = "default_selection")]
    pub selection: String,
    /// ANSI color name (`red`, `bright-red`) to color
    #[serde(default)]
    pub palette: BTreeMap<String, String>,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            foreground: default_foreground(),
            background: default_background(),
            cursor: default_foreground(),
            selection: default_selection(),
            palette: BTreeMap::new(),
        }
    }
}

impl AppearanceConfig {
    pub fn theme(&self) -> ConfigResult<Theme> {
        Ok(Theme {
            foreground: parse_color("appearance.foreground", &self.foreground)?,
            background: parse_color("appearance.background", &self.background)?,
            cursor: parse_color("appearance.cursor", &self.cursor)?,
            selection: parse_color("appearance.selection", &self.selection)?,
        })
    }

    /// Default palette with the configured overrides applied
    pub fn palette(&self) -> ConfigResult<AnsiPalette> {
        let mut palette = AnsiPalette::default();
        for (name, value) in &self.palette {
            let ansi = AnsiColor::ALL
                .into_iter()
                .find(|c| c.name() == name)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("appearance.palette: unknown color '{name}'"))
                })?;
            palette.set(ansi, parse_color(&format!("appearance.palette.{name}"), value)?);
        }
        Ok(palette)
    }
}

fn parse_color(field: &str, value: &str) -> ConfigResult<Rgb> {
    Rgb::from_hex(value)
        .ok_or_else(|| ConfigError::Invalid(format!("{field}: '{value}' is not a #rrggbb color")))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default = "default_false")]
    pub file_line: bool,
    #[serde(default = "default_false")]
    pub file_output: bool,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
            file_line: false,
            file_output: false,
            file_path: None,
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_max_output_lines() -> usize {
    crate::terminal::buffer::MAX_OUTPUT_LINES
}

fn default_scroll_threshold() -> f64 {
    crate::terminal::buffer::SCROLL_THRESHOLD_PX
}

fn default_history_size() -> usize {
    crate::history::MAX_HISTORY_SIZE
}

fn default_url() -> String {
    "ws://localhost:8000/ws/terminal/".to_string()
}

fn default_reconnect_interval() -> u64 {
    crate::transport::connection::RECONNECT_INTERVAL_MS
}

fn default_reconnect_attempts() -> u32 {
    crate::transport::connection::MAX_RECONNECT_ATTEMPTS
}

fn default_reconnect_delay() -> u64 {
    crate::transport::connection::MAX_RECONNECT_DELAY_MS
}

fn default_foreground() -> String {
    "#00ff00".to_string()
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_selection() -> String {
    "#444444".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

// ============================================================================
// Configuration loading
// ============================================================================

impl AppConfig {
    /// Load configuration with fallback chain:
    /// 1. Project-local .webterm/config.toml
    /// 2. User config ~/.config/webterm/config.toml
    /// 3. Embedded default_config.toml
    pub fn load() -> ConfigResult<Self> {
        let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse default config: {e}")))?;

        let layers = [
            ("user", Self::user_config_path()),
            ("project", Self::project_config_path()),
        ];
        for (layer, path) in layers {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            match Self::load_from_file(&path) {
                Ok(overlay) => {
                    config = overlay;
                    tracing::info!("Loaded {layer} config from {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {layer} config: {e}");
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the user config path (~/.config/webterm/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config_dir| config_dir.join("webterm").join("config.toml"))
    }

    /// Get the project-local config path (./.webterm/config.toml)
    pub fn project_config_path() -> Option<PathBuf> {
        std::env::current_dir()
            .ok()
            .map(|cwd| cwd.join(".webterm").join("config.toml"))
    }

    /// Reject values the terminal cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.terminal.max_output_lines == 0 {
            return Err(ConfigError::Invalid(
                "terminal.max_output_lines must be greater than 0".to_string(),
            ));
        }
        if self.history.max_size == 0 {
            return Err(ConfigError::Invalid(
                "history.max_size must be greater than 0".to_string(),
            ));
        }
        if self.transport.reconnect_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.reconnect_interval_ms must be greater than 0".to_string(),
            ));
        }
        self.appearance.theme()?;
        self.appearance.palette()?;
        Ok(())
    }

    /// Write configuration as TOML
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, toml_string).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            terminal: TerminalConfig::default(),
            history: HistoryConfig::default(),
            transport: TransportConfig::default(),
            appearance: AppearanceConfig::default(),
            logging: LoggingConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.terminal.max_output_lines, 10000);
        assert_eq!(config.terminal.scroll_threshold_px, 10.0);
        assert_eq!(config.terminal.prompt, None);
        assert_eq!(config.history.max_size, 1000);
        assert_eq!(config.transport.url, "ws://localhost:8000/ws/terminal/");
        assert_eq!(config.transport.max_reconnect_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[history]\nmax_size = 50\n").unwrap();
        assert_eq!(config.history.max_size, 50);
        assert_eq!(config.terminal.max_output_lines, 10000);
        assert_eq!(config.transport.reconnect_interval_ms, 3000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_reconnect_policy() {
        let policy = AppConfig::default().transport.reconnect_policy();
        assert_eq!(policy, ReconnectPolicy::default());
    }

    #[test]
    fn test_palette_overrides() {
        let mut appearance = AppearanceConfig::default();
        appearance
            .palette
            .insert("bright-red".to_string(), "#123456".to_string());

        let palette = appearance.palette().unwrap();
        assert_eq!(palette.get(AnsiColor::BrightRed), Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(palette.get(AnsiColor::Red), AnsiColor::Red.default_color());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.terminal.max_output_lines = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.appearance.foreground = "green".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config
            .appearance
            .palette
            .insert("chartreuse".to_string(), "#00ff00".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[terminal]\nmax_output_lines = 200\nprompt = \"$ \"").unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.terminal.max_output_lines, 200);
        assert_eq!(config.terminal.prompt.as_deref(), Some("$ "));
    }

    #[test]
    fn test_load_from_file_errors() {
        let missing = AppConfig::load_from_file(Path::new("/nonexistent/webterm.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[terminal\nbroken").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.history.max_size = 42;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.history.max_size, 42);
    }
}
