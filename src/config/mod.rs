//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`DESKPILOT_API_KEY`, `DESKPILOT_MODEL`,
//!    `DESKPILOT_BASE_URL`, `DESKPILOT_MAX_TOKENS`,
//!    `DESKPILOT_API_TIMEOUT_SECS`) with `ANTHROPIC_API_KEY` / `MODEL_NAME` /
//!    `MAX_OUTPUT_TOKENS` fallbacks.
//! 2. TOML file specified via --config CLI flag
//! 3. ./deskpilot.toml in the current directory
//! 4. $XDG_CONFIG_HOME/deskpilot/deskpilot.toml (or ~/.config/deskpilot/deskpilot.toml)
//! 5. Built-in defaults

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod env;
mod sources;
mod types;

pub use defaults::default_shell_denylist;
pub use sources::ConfigSource;
pub use types::{
    AgentConfig, ApiConfig, ComputerConfig, Config, DisplayConfig, LoadedConfig, LoggingConfig,
    ServerConfig, ToolsConfig,
};

use env::apply_runtime_env_overrides;
use sources::read_config_text_with_sources;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from --config flag).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_with_source(path_override)?.config)
}

/// Load configuration and report which file it came from.
pub fn load_config_with_source(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (config_text, source) =
        read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&config_text)?;
    apply_runtime_env_overrides(&mut config, &env_lookup)?;
    validate(&config)?;
    tracing::debug!(source = %source, model = %config.api.model, "configuration loaded");

    Ok(LoadedConfig { config, source })
}

/// Reject values the runtime can't work with.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.max_tokens == 0 {
        return Err(ConfigError::Invalid("api.max_tokens must be positive".into()));
    }
    if config.api.max_attempts == 0 {
        return Err(ConfigError::Invalid("api.max_attempts must be at least 1".into()));
    }
    if config.computer.reference_width == 0 || config.computer.reference_height == 0 {
        return Err(ConfigError::Invalid(
            "computer.reference_width and computer.reference_height must be positive".into(),
        ));
    }
    if config.tools.shell_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "tools.shell_timeout_secs must be positive".into(),
        ));
    }
    if config.agent.max_turns == Some(0) {
        return Err(ConfigError::Invalid("agent.max_turns must be positive".into()));
    }
    Ok(())
}

pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::shell::ShellKind;
    use std::collections::BTreeMap;

    #[test]
    fn defaults_are_sensible() {
        let c = Config::default();
        assert_eq!(c.api.base_url, "https://api.anthropic.com");
        assert_eq!(c.api.model, "claude-3-7-sonnet-20250219");
        assert_eq!(c.api.max_tokens, 4096);
        assert_eq!(c.api.anthropic_version, "2023-06-01");
        assert_eq!(c.api.max_attempts, 3);
        assert!(c.api.api_key.is_empty());
        assert_eq!(c.agent.max_turns, None);
        assert!(c.tools.shell_enabled && c.tools.files_enabled && c.tools.computer_enabled);
        assert_eq!(c.tools.shell_timeout_secs, 30);
        assert!(c.tools.shell_denylist.iter().any(|p| p == "diskpart"));
        assert_eq!(c.computer.reference_width, 1920);
        assert_eq!(c.computer.reference_height, 1080);
        assert!(c.display.color);
        assert!(!c.display.hide_images);
        assert!(c.logging.enabled);
    }

    #[test]
    fn parse_partial_toml() {
        let toml = r#"
            [agent]
            system_prompt_suffix = "Prefer keyboard shortcuts."
            max_turns = 25

            [tools]
            shell = "cmd"
            protected_paths = ['D:\Secrets']

            [display]
            hide_images = true
        "#;
        let loaded = load_for_test(None, files(&[("deskpilot.toml", toml)]), BTreeMap::new(), None)
            .unwrap();
        let c = loaded.config;
        assert_eq!(c.agent.system_prompt_suffix, "Prefer keyboard shortcuts.");
        assert_eq!(c.agent.max_turns, Some(25));
        assert_eq!(c.tools.shell, Some(ShellKind::Cmd));
        assert_eq!(c.tools.protected_paths, Some(vec![r"D:\Secrets".to_string()]));
        assert!(c.display.hide_images);
        assert!(c.display.color);
        assert_eq!(c.api.max_tokens, 4096);
        assert_eq!(loaded.source, ConfigSource::Local);
    }

    #[test]
    fn parse_empty_string_uses_defaults() {
        let loaded = load_for_test(None, BTreeMap::new(), BTreeMap::new(), None).unwrap();
        assert_eq!(loaded.source, ConfigSource::BuiltInDefaults);
        assert_eq!(loaded.source.to_string(), "built-in defaults");
        assert_eq!(loaded.config.api.model, "claude-3-7-sonnet-20250219");
    }

    #[test]
    fn explicit_path_wins_and_must_exist() {
        let sources = files(&[
            ("custom.toml", "[api]\nmodel = \"explicit\"\n"),
            ("deskpilot.toml", "[api]\nmodel = \"local\"\n"),
        ]);
        let loaded = load_for_test(Some("custom.toml"), sources.clone(), BTreeMap::new(), None)
            .unwrap();
        assert_eq!(loaded.config.api.model, "explicit");
        assert_eq!(
            loaded.source,
            ConfigSource::Explicit(PathBuf::from("custom.toml"))
        );

        let err = load_for_test(Some("missing.toml"), sources, BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)), "got: {err}");
    }

    #[test]
    fn local_file_preferred_over_global() {
        let sources = files(&[
            ("deskpilot.toml", "[api]\nmodel = \"local\"\n"),
            ("/cfg/deskpilot/deskpilot.toml", "[api]\nmodel = \"global\"\n"),
        ]);
        let loaded =
            load_for_test(None, sources, BTreeMap::new(), Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(loaded.config.api.model, "local");
    }

    #[test]
    fn global_file_used_when_no_local_file() {
        let sources = files(&[("/cfg/deskpilot/deskpilot.toml", "[api]\nmodel = \"global\"\n")]);
        let loaded =
            load_for_test(None, sources, BTreeMap::new(), Some(PathBuf::from("/cfg"))).unwrap();
        assert_eq!(loaded.config.api.model, "global");
        assert!(matches!(loaded.source, ConfigSource::Global(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let sources = files(&[("deskpilot.toml", "[api]\nmodel = \"file-model\"\nmax_tokens = 100\n")]);
        let env = vars(&[
            ("DESKPILOT_API_KEY", "sk-canonical"),
            ("ANTHROPIC_API_KEY", "sk-fallback"),
            ("DESKPILOT_MODEL", "env-model"),
            ("DESKPILOT_BASE_URL", "http://127.0.0.1:9999"),
            ("MAX_OUTPUT_TOKENS", "2048"),
            ("DESKPILOT_API_TIMEOUT_SECS", "0"),
        ]);
        let c = load_for_test(None, sources, env, None).unwrap().config;
        assert_eq!(c.api.api_key, "sk-canonical");
        assert_eq!(c.api.model, "env-model");
        assert_eq!(c.api.base_url, "http://127.0.0.1:9999");
        assert_eq!(c.api.max_tokens, 2048);
        assert_eq!(c.api.timeout_secs, 1);
    }

    #[test]
    fn fallback_env_names_are_honored() {
        let env = vars(&[("ANTHROPIC_API_KEY", "sk-ant"), ("MODEL_NAME", "claude-x")]);
        let c = load_for_test(None, BTreeMap::new(), env, None).unwrap().config;
        assert_eq!(c.api.api_key, "sk-ant");
        assert_eq!(c.api.model, "claude-x");
    }

    #[test]
    fn invalid_env_numbers_are_rejected() {
        let env = vars(&[("DESKPILOT_MAX_TOKENS", "lots")]);
        let err = load_for_test(None, BTreeMap::new(), env, None).unwrap_err();
        assert!(err.to_string().contains("DESKPILOT_MAX_TOKENS"), "got: {err}");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let sources = files(&[("deskpilot.toml", "[computer]\nreference_width = 0\n")]);
        let err = load_for_test(None, sources, BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");

        let sources = files(&[("deskpilot.toml", "[agent]\nmax_turns = 0\n")]);
        assert!(load_for_test(None, sources, BTreeMap::new(), None).is_err());
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        let sources = files(&[("deskpilot.toml", "[api\nmodel = 1")]);
        let err = load_for_test(None, sources, BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)), "got: {err}");
    }

    #[test]
    fn logging_dir_prefers_configured_value() {
        let logging = LoggingConfig {
            dir: Some("  /var/log/deskpilot ".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(logging.resolved_dir(), PathBuf::from("/var/log/deskpilot"));
        assert!(LoggingConfig::default().resolved_dir().ends_with("logs"));
    }

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn vars(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        files(entries)
    }

    fn load_for_test(
        path_override: Option<&str>,
        files: BTreeMap<String, String>,
        env: BTreeMap<String, String>,
        config_root: Option<PathBuf>,
    ) -> Result<LoadedConfig, ConfigError> {
        load_config_from_sources(
            path_override,
            move |path| {
                let key = path.to_string_lossy().into_owned();
                files
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, key))
            },
            move |name| env.get(name).cloned(),
            move || config_root.clone(),
        )
    }
}
