//! Configuration data model.
//!
//! Struct/enum definitions plus default values. Loading and precedence live
//! in `config::mod`.

use serde::Deserialize;
use std::path::PathBuf;

use super::defaults::{
    default_shell_denylist, DEFAULT_ANTHROPIC_VERSION, DEFAULT_API_BASE_URL,
    DEFAULT_API_MAX_ATTEMPTS, DEFAULT_API_TIMEOUT_SECS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL_ID,
    DEFAULT_REFERENCE_HEIGHT, DEFAULT_REFERENCE_WIDTH, DEFAULT_SCREENSHOT_DELAY_MS,
    DEFAULT_SERVER_BIND, DEFAULT_SHELL_TIMEOUT_SECS,
};
use crate::tools::shell::ShellKind;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    pub computer: ComputerConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Upstream API connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Usually supplied through the environment rather than the file.
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub anthropic_version: String,
    /// Optional `anthropic-beta` header value.
    pub beta: Option<String>,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            api_key: String::new(),
            model: DEFAULT_MODEL_ID.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.into(),
            beta: None,
            max_attempts: DEFAULT_API_MAX_ATTEMPTS,
        }
    }
}

/// Conversation behavior settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Extra instructions appended to the built-in system prompt.
    pub system_prompt_suffix: String,
    /// Cap on model turns per run. Unlimited when absent.
    pub max_turns: Option<usize>,
}

/// Tool availability and safety settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub computer_enabled: bool,
    pub shell_enabled: bool,
    pub files_enabled: bool,
    /// Interpreter for the shell tool. Platform default when absent.
    pub shell: Option<ShellKind>,
    pub shell_timeout_secs: u64,
    /// Case-insensitive substrings that block a shell command.
    pub shell_denylist: Vec<String>,
    /// Directories the file tools refuse to touch. Host system dirs when absent.
    pub protected_paths: Option<Vec<String>>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            computer_enabled: true,
            shell_enabled: true,
            files_enabled: true,
            shell: None,
            shell_timeout_secs: DEFAULT_SHELL_TIMEOUT_SECS,
            shell_denylist: default_shell_denylist(),
            protected_paths: None,
        }
    }
}

/// Screen automation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComputerConfig {
    pub reference_width: u32,
    pub reference_height: u32,
    pub screenshot_delay_ms: u64,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            reference_width: DEFAULT_REFERENCE_WIDTH,
            reference_height: DEFAULT_REFERENCE_HEIGHT,
            screenshot_delay_ms: DEFAULT_SCREENSHOT_DELAY_MS,
        }
    }
}

/// Display / rendering preferences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
    /// Don't print screenshot notices in the terminal.
    pub hide_images: bool,
    /// Print a summary of every API request/response.
    pub show_http: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            hide_images: false,
            show_http: false,
        }
    }
}

/// Conversation log settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Root log directory. Platform data dir when absent.
    pub dir: Option<String>,
    /// Keep screenshots next to the session log.
    pub save_screenshots: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            save_screenshots: true,
        }
    }
}

impl LoggingConfig {
    /// Configured dir, else `<data_local_dir>/deskpilot/logs`, else `./logs`.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(dir) = self.dir.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .map(|d| d.join("deskpilot").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

/// HTTP front-end settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_SERVER_BIND.into(),
        }
    }
}

/// Configuration payload plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: super::sources::ConfigSource,
}
