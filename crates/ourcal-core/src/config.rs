//! Configuration management
//!
//! Settings are resolved in this order of precedence:
//! 1. Environment variables
//! 2. `ourcal.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` inside the configuration file expands to the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "ourcal.toml";

/// Main configuration for the calendar server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Users seeded at startup
    #[serde(default)]
    pub users: UsersConfig,

    /// Notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersConfig {
    /// Names inserted at startup when missing
    #[serde(default = "default_user_names")]
    pub names: Vec<String>,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            names: default_user_names(),
        }
    }
}

/// One notification direction: when `actor` writes an event, tell `recipient`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRule {
    pub actor: String,
    pub recipient: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub pass: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Whether notifications are dispatched at all
    #[serde(default = "default_notify_enabled")]
    pub enabled: bool,

    /// Capacity of the pending notification queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Link included at the bottom of notification messages
    pub calendar_url: Option<String>,

    /// Who notifies whom
    #[serde(default = "default_notify_rules")]
    pub rules: Vec<NotifyRule>,

    /// SMTP transport; messages are only logged when absent
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_notify_enabled(),
            queue_capacity: default_queue_capacity(),
            calendar_url: None,
            rules: default_notify_rules(),
            smtp: None,
        }
    }
}

fn default_api_port() -> u16 {
    5001
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "https://carlaveto.net".to_string(),
    ]
}

fn default_db_path() -> String {
    "data/ourcal.db".to_string()
}

fn default_user_names() -> Vec<String> {
    vec!["Angel".to_string(), "Andrea".to_string()]
}

fn default_notify_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    64
}

fn default_notify_rules() -> Vec<NotifyRule> {
    vec![NotifyRule {
        actor: "Angel".to_string(),
        recipient: "Andrea".to_string(),
        email: "andrea@example.com".to_string(),
    }]
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@localhost".to_string()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an on/off switch such as `true`, `0`, `no` or `off`
fn parse_flag(name: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid {}: {}", name, value))),
    }
}

/// Parse `actor:recipient:email` entries separated by commas
fn parse_rules(value: &str) -> crate::Result<Vec<NotifyRule>> {
    split_list(value)
        .into_iter()
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            match parts.as_slice() {
                [actor, recipient, email] => Ok(NotifyRule {
                    actor: actor.to_string(),
                    recipient: recipient.to_string(),
                    email: email.to_string(),
                }),
                _ => Err(Error::Config(format!(
                    "Invalid notification rule '{}', expected actor:recipient:email",
                    entry
                ))),
            }
        })
        .collect()
}

impl Config {
    /// Replace `${VAR_NAME}` with environment values.
    ///
    /// Unset variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Parse TOML content after expanding environment references
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load from an explicit path, else `ourcal.toml` if present, else the environment
    pub fn load(path: Option<&str>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Override settings with environment variables
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override settings from any key lookup shaped like the environment
    fn apply_overrides<F>(&mut self, var: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("API_PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid API_PORT: {}", port)))?;
        }
        if let Some(origins) = var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = split_list(&origins);
        }

        if let Some(path) = var("DB_PATH").filter(|p| !p.is_empty()) {
            self.database.db_path = path;
        }

        if let Some(names) = var("SEED_USERS") {
            self.users.names = split_list(&names);
        }

        if let Some(enabled) = var("NOTIFY_ENABLED") {
            self.notify.enabled = parse_flag("NOTIFY_ENABLED", &enabled)?;
        }
        if let Some(url) = var("NOTIFY_CALENDAR_URL") {
            self.notify.calendar_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(rules) = var("NOTIFY_RULES") {
            self.notify.rules = parse_rules(&rules)?;
        }

        if let Some(host) = var("SMTP_HOST").filter(|h| !h.is_empty()) {
            let smtp = self.notify.smtp.get_or_insert_with(|| SmtpConfig {
                host: String::new(),
                port: default_smtp_port(),
                user: String::new(),
                pass: String::new(),
                from_address: default_from_address(),
                from_name: None,
            });
            smtp.host = host;
        }
        if let Some(smtp) = self.notify.smtp.as_mut() {
            if let Some(port) = var("SMTP_PORT") {
                smtp.port = port
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid SMTP_PORT: {}", port)))?;
            }
            if let Some(user) = var("SMTP_USER") {
                smtp.user = user;
            }
            if let Some(pass) = var("SMTP_PASS") {
                smtp.pass = pass;
            }
            if let Some(from) = var("SMTP_FROM") {
                smtp.from_address = from;
            }
        }

        Ok(())
    }
}
