//! Application entry orchestration for the deskpilot CLI.

use crate::cli::{Args, Command};
use deskpilot::build_info::cli_version_text;
use deskpilot::config::{load_config_with_source, Config, DisplayConfig, LoadedConfig};
use deskpilot::render::Renderer;

/// Top-level CLI entrypoint that dispatches serve/one-shot/REPL flows.
pub(crate) async fn run(args: Args) -> i32 {
    if args.version {
        println!("{}", cli_version_text());
        return 0;
    }

    let mut bootstrap_renderer = Renderer::new(&DisplayConfig {
        color: !args.no_color,
        ..DisplayConfig::default()
    });
    let LoadedConfig { mut config, source } = match load_config_with_source(args.config.as_deref())
    {
        Ok(loaded) => loaded,
        Err(err) => {
            bootstrap_renderer.error(&err.to_string());
            return 1;
        }
    };
    apply_cli_overrides(&args, &mut config);
    tracing::info!(source = %source, model = %config.api.model, "starting");

    if let Err(msg) = ensure_api_key(&config) {
        bootstrap_renderer.error(&msg);
        return 1;
    }

    match args.command {
        Some(Command::Serve { bind }) => crate::app::serve_mode::run_serve_mode(config, bind).await,
        None => match args.prompt {
            Some(prompt) => crate::app::exec_mode::run_exec_mode(config, prompt).await,
            None => crate::app::repl_mode::run_repl_mode(config, &source).await,
        },
    }
}

/// CLI flags win over file and environment settings.
fn apply_cli_overrides(args: &Args, config: &mut Config) {
    if let Some(model) = &args.model {
        config.api.model = model.clone();
    }
    if let Some(url) = &args.base_url {
        config.api.base_url = url.clone();
    }
    if args.no_color {
        config.display.color = false;
    }
    if args.show_http {
        config.display.show_http = true;
    }
}

fn ensure_api_key(config: &Config) -> Result<(), String> {
    if config.api.api_key.trim().is_empty() {
        return Err(
            "no API key configured: set ANTHROPIC_API_KEY (or DESKPILOT_API_KEY) or [api] api_key"
                .to_string(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_flags_override_config() {
        let args = Args::parse_from([
            "deskpilot",
            "--model",
            "claude-test",
            "--base-url",
            "http://127.0.0.1:9",
            "--no-color",
            "--show-http",
        ]);
        let mut config = Config::default();
        apply_cli_overrides(&args, &mut config);
        assert_eq!(config.api.model, "claude-test");
        assert_eq!(config.api.base_url, "http://127.0.0.1:9");
        assert!(!config.display.color);
        assert!(config.display.show_http);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let args = Args::parse_from(["deskpilot"]);
        let mut config = Config::default();
        let before = config.api.model.clone();
        apply_cli_overrides(&args, &mut config);
        assert_eq!(config.api.model, before);
        assert!(config.display.color);
    }

    #[test]
    fn missing_api_key_is_reported() {
        let mut config = Config::default();
        config.api.api_key = "  ".into();
        let err = ensure_api_key(&config).unwrap_err();
        assert!(err.contains("ANTHROPIC_API_KEY"));

        config.api.api_key = "sk-ant-test".into();
        assert!(ensure_api_key(&config).is_ok());
    }
}
