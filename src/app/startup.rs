//! Shared setup for the interactive and one-shot modes.

use std::path::Path;

use deskpilot::agent::Agent;
use deskpilot::build_info::startup_metadata_line;
use deskpilot::config::{Config, ConfigSource};
use deskpilot::render::Renderer;
use deskpilot::session::SessionLog;
use deskpilot::tools::builtin_registry;
use deskpilot::tools::computer::native_desktop;

/// Agent plus the session log it reports into.
pub(crate) struct RunSetup {
    pub agent: Agent,
    pub session: Option<SessionLog>,
}

/// Open the session log, probe the desktop and register the enabled tools.
///
/// Unavailable pieces are reported as warnings; the run goes on without them.
pub(crate) fn prepare_run(config: &Config, renderer: &mut Renderer) -> RunSetup {
    let session = if config.logging.enabled {
        let root = config.logging.resolved_dir();
        match SessionLog::create(&root) {
            Ok(log) => Some(log),
            Err(err) => {
                renderer.warn(&format!(
                    "conversation log disabled: cannot write {}: {err}",
                    root.display()
                ));
                None
            }
        }
    } else {
        None
    };

    let desktop = if config.tools.computer_enabled {
        match native_desktop() {
            Ok(desktop) => Some(desktop),
            Err(err) => {
                renderer.warn(&format!("computer tool disabled: {err}"));
                None
            }
        }
    } else {
        None
    };

    let screenshot_dir = session
        .as_ref()
        .filter(|_| config.logging.save_screenshots)
        .map(|log| log.screenshot_dir().to_path_buf());
    let tools = builtin_registry(config, desktop, screenshot_dir.as_deref());
    if tools.is_empty() {
        renderer.warn("no tools enabled; the model can only answer in text");
    }

    RunSetup {
        agent: Agent::new(config, tools),
        session,
    }
}

/// Render the REPL banner: model, build, tools and where the log goes.
pub(crate) fn render_startup_banner(
    renderer: &mut Renderer,
    config: &Config,
    setup: &RunSetup,
    source: &ConfigSource,
) {
    renderer.header(&config.api.model, &startup_metadata_line());
    renderer.info(&banner_detail(
        &setup.agent.tool_names(),
        setup.session.as_ref().map(SessionLog::log_path),
        source,
    ));
}

fn banner_detail(tools: &[&str], log_path: Option<&Path>, source: &ConfigSource) -> String {
    let tools = if tools.is_empty() {
        "none".to_string()
    } else {
        tools.join(", ")
    };
    let log = log_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "off".to_string());
    format!("tools: {tools}\nconfig: {source}\nlog: {log}\n/reset clears the conversation, /exit quits")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn banner_lists_tools_config_and_log() {
        let log = PathBuf::from("logs/2025-03-03/140509-abcd1234.log");
        let text = banner_detail(
            &["computer", "shell"],
            Some(&log),
            &ConfigSource::BuiltInDefaults,
        );
        assert!(text.contains("tools: computer, shell"));
        assert!(text.contains("config: built-in defaults"));
        assert!(text.contains("140509-abcd1234.log"));
    }

    #[test]
    fn banner_marks_missing_pieces() {
        let text = banner_detail(&[], None, &ConfigSource::BuiltInDefaults);
        assert!(text.contains("tools: none"));
        assert!(text.contains("log: off"));
    }
}
