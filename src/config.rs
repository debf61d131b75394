//! Configuration loading for chatdeck.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directory::{Contact, Room};
use crate::error::{Error, Result};

/// Get the chatdeck home directory (~/.chatdeck).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".chatdeck"))
}

/// Get the default settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from `path`, or from ~/.chatdeck/settings.json.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => get_settings_path()?,
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}. Run 'chatdeck setup' first.",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Write default settings to `path`. Refuses to overwrite unless `force`.
pub fn write_default_settings(path: &Path, force: bool) -> Result<Settings> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "Settings file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    let settings = Settings::default();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&settings)?)?;
    tracing::info!("Wrote default settings to {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.sessions.is_empty() {
        return Err(Error::Config("No sessions configured".to_string()));
    }

    let mut seen = HashSet::new();
    for session in &settings.sessions {
        if session.id.trim().is_empty() {
            return Err(Error::Config("Session id must not be empty".to_string()));
        }
        if !seen.insert(session.id.as_str()) {
            return Err(Error::Config(format!("Duplicate session id '{}'", session.id)));
        }
        if let Transport::Telegram { bot_token } = &session.transport {
            if bot_token.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Session '{}' has no bot token",
                    session.id
                )));
            }
        }
    }

    if settings.primary >= settings.sessions.len() {
        return Err(Error::Config(format!(
            "primary index {} out of range ({} sessions)",
            settings.primary,
            settings.sessions.len()
        )));
    }

    settings.trigger.compile()?;
    Ok(())
}

/// How a session talks to its network.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    Telegram {
        bot_token: String,
    },
    Local {
        #[serde(default = "default_local_account")]
        account: String,
        #[serde(default)]
        contacts: Vec<Contact>,
        #[serde(default)]
        rooms: Vec<Room>,
    },
}

fn default_local_account() -> String {
    "local".to_string()
}

impl Transport {
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Telegram { .. } => "telegram",
            Transport::Local { .. } => "local",
        }
    }
}

/// Session configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SessionConfig {
    pub id: String,
    pub transport: Transport,
}

/// Auto-reply trigger.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Trigger {
    #[serde(default = "default_trigger_pattern")]
    pub pattern: String,
    #[serde(default = "default_trigger_reply")]
    pub reply: String,
}

fn default_trigger_pattern() -> String {
    "^ding$".to_string()
}

fn default_trigger_reply() -> String {
    "dong".to_string()
}

impl Trigger {
    pub fn compile(&self) -> Result<regex::Regex> {
        regex::Regex::new(&self.pattern)
            .map_err(|e| Error::Config(format!("Invalid trigger pattern: {}", e)))
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            pattern: default_trigger_pattern(),
            reply: default_trigger_reply(),
        }
    }
}

/// Console configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConsoleConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_prompt() -> String {
    "chatdeck> ".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
        }
    }
}

/// chatdeck settings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,

    #[serde(default)]
    pub primary: usize,

    #[serde(default)]
    pub trigger: Trigger,

    #[serde(default)]
    pub console: ConsoleConfig,

    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolve the cache directory and create it if missing.
    pub fn ensure_cache_dir(&self) -> Result<PathBuf> {
        let dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => get_home_dir()?.join("cache"),
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            tracing::info!("Created cache directory {}", dir.display());
        }
        Ok(dir)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sessions: vec![SessionConfig {
                id: "demo".to_string(),
                transport: Transport::Local {
                    account: "demo_bot".to_string(),
                    contacts: vec![
                        Contact::new("1", "Adam Smith").with_alias("adam"),
                        Contact::new("2", "Bob Jones"),
                    ],
                    rooms: vec![Room::new("100", "Weekend plans")],
                },
            }],
            primary: 0,
            trigger: Trigger::default(),
            console: ConsoleConfig::default(),
            cache_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("settings.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_default_settings_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("settings.json");
        write_default_settings(&path, false).unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.sessions.len(), 1);
        assert_eq!(settings.sessions[0].transport.kind(), "local");
        assert_eq!(settings.console.prompt, "chatdeck> ");

        assert!(write_default_settings(&path, false).is_err());
        assert!(write_default_settings(&path, true).is_ok());
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(
            temp_dir.path(),
            r#"{"sessions": [{"id": "a", "transport": {"type": "telegram", "bot_token": "1:x"}}]}"#,
        );

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.primary, 0);
        assert_eq!(settings.trigger.pattern, "^ding$");
        assert_eq!(settings.trigger.reply, "dong");
    }

    #[test]
    fn test_validation_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cases = [
            r#"{"sessions": []}"#,
            r#"{"sessions": [{"id": "a", "transport": {"type": "local"}}, {"id": "a", "transport": {"type": "local"}}]}"#,
            r#"{"sessions": [{"id": "a", "transport": {"type": "local"}}], "primary": 1}"#,
            r#"{"sessions": [{"id": "a", "transport": {"type": "telegram", "bot_token": " "}}]}"#,
            r#"{"sessions": [{"id": "a", "transport": {"type": "local"}}], "trigger": {"pattern": "("}}"#,
        ];
        for json in cases {
            let path = write(temp_dir.path(), json);
            let err = load_settings(Some(&path)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} -> {:?}", json, err);
        }
    }

    #[test]
    fn test_cache_dir_created_on_first_use() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            cache_dir: Some(temp_dir.path().join("cache")),
            ..Settings::default()
        };
        let dir = settings.ensure_cache_dir().unwrap();
        assert!(dir.is_dir());
    }
}
