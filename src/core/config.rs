use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// A reusable system prompt. Three built-ins ship with the binary; more can
/// be defined in the config file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomTheme {
    pub id: String,
    pub display_name: String,
    pub background: Option<String>,
    pub user_prefix: Option<String>,
    pub user_text: Option<String>,
    pub assistant_text: Option<String>,
    pub system_text: Option<String>,
    pub info_text: Option<String>,
    pub error_text: Option<String>,
    pub title: Option<String>,
    pub streaming_indicator: Option<String>,
    pub input_border: Option<String>,
    pub input_title: Option<String>,
    pub input_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Backend base URL; falls back to http://localhost:5050
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub default_provider: Option<String>,
    /// Active persona id, sent with chat requests until changed
    pub persona: Option<String>,
    /// UI theme name (e.g., "dark", "light", or a custom theme id)
    pub theme: Option<String>,
    /// Enable markdown rendering in the chat area
    pub markdown: Option<bool>,
    /// Enable syntax highlighting for fenced code blocks when markdown is enabled
    pub syntax: Option<bool>,
    /// Per-provider API keys, forwarded to the backend with requests
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
    /// Include built-in presets shipped with the binary
    #[serde(default)]
    pub builtin_presets: Option<bool>,
    /// User-defined system-prompt presets
    #[serde(default)]
    pub presets: Vec<Preset>,
    #[serde(default)]
    pub custom_themes: Vec<CustomTheme>,
}

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(
                    f,
                    "Failed to read config at {}: {}",
                    path_display(path),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path_display(path),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Keys accepted by `chatbowl set` / `chatbowl unset` and the in-chat
/// equivalents.
pub const SETTABLE_KEYS: &[&str] = &[
    "base-url",
    "default-model",
    "default-provider",
    "persona",
    "theme",
    "markdown",
    "syntax",
];

impl Config {
    pub fn load() -> Result<Config, Box<dyn StdError>> {
        Self::load_from_path(&Self::get_config_path())
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn StdError>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn StdError>> {
        self.save_to_path(&Self::get_config_path())
    }

    pub(crate) fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn StdError>> {
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file
            .persist(config_path)
            .map_err(|err| -> Box<dyn StdError> { Box::new(err) })?;
        Ok(())
    }

    pub(crate) fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "chatbowl")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn set_api_key(&mut self, provider: &str, key: String) {
        self.api_keys.insert(provider.to_lowercase(), key);
    }

    pub fn remove_api_key(&mut self, provider: &str) -> bool {
        self.api_keys.remove(&provider.to_lowercase()).is_some()
    }

    pub fn api_key_for(&self, provider: &str) -> Option<&String> {
        self.api_keys.get(&provider.to_lowercase())
    }

    pub fn find_preset(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn get_custom_theme(&self, id: &str) -> Option<&CustomTheme> {
        self.custom_themes
            .iter()
            .find(|t| t.id.eq_ignore_ascii_case(id))
    }

    /// Assign one settable key. Boolean keys accept true/false word forms.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "default-provider" => self.default_provider = Some(value.to_string()),
            "persona" => self.persona = Some(value.to_string()),
            "theme" => self.theme = Some(value.to_string()),
            "markdown" => self.markdown = Some(parse_bool(key, value)?),
            "syntax" => self.syntax = Some(parse_bool(key, value)?),
            _ => {
                return Err(format!(
                    "Unknown setting '{}'. Available: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                ))
            }
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = None,
            "default-model" => self.default_model = None,
            "default-provider" => self.default_provider = None,
            "persona" => self.persona = None,
            "theme" => self.theme = None,
            "markdown" => self.markdown = None,
            "syntax" => self.syntax = None,
            _ => {
                return Err(format!(
                    "Unknown setting '{}'. Available: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                ))
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        _ => Err(format!("'{key}' expects true or false, got '{value}'")),
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(&dir.path().join("config.toml")).unwrap();
        assert!(config.base_url.is_none());
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config {
            default_model: Some("llama3".to_string()),
            ..Default::default()
        };
        config.set_api_key("OpenAI", "sk-test".to_string());
        config.presets.push(Preset {
            id: "pirate".to_string(),
            name: "Pirate".to_string(),
            prompt: "You are a pirate.".to_string(),
        });
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.default_model.as_deref(), Some("llama3"));
        assert_eq!(
            loaded.api_key_for("openai").map(String::as_str),
            Some("sk-test")
        );
        assert_eq!(loaded.presets.len(), 1);
        assert_eq!(loaded.find_preset("PIRATE").unwrap().name, "Pirate");
    }

    #[test]
    fn set_value_rejects_unknown_keys() {
        let mut config = Config::default();
        let err = config.set_value("colour", "mauve").unwrap_err();
        assert!(err.contains("Unknown setting"));
        assert!(err.contains("base-url"));
    }

    #[test]
    fn boolean_keys_parse_word_forms() {
        let mut config = Config::default();
        config.set_value("markdown", "off").unwrap();
        assert_eq!(config.markdown, Some(false));
        config.set_value("syntax", "Yes").unwrap();
        assert_eq!(config.syntax, Some(true));
        assert!(config.set_value("markdown", "maybe").is_err());
    }

    #[test]
    fn unset_clears_fields() {
        let mut config = Config::default();
        config.set_value("theme", "light").unwrap();
        config.unset_value("theme").unwrap();
        assert!(config.theme.is_none());
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "theme = [not toml").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
