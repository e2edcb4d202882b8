//! One-shot exec mode orchestration.

use crate::app::startup::{prepare_run, RunSetup};
use deskpilot::config::Config;
use deskpilot::render::Renderer;

/// Run a single prompt to completion and exit.
///
/// Assistant text is streamed to stdout as it arrives; the exit code is 1
/// when the run fails.
pub(crate) async fn run_exec_mode(config: Config, prompt: String) -> i32 {
    let mut renderer = Renderer::new(&config.display);
    let RunSetup {
        mut agent,
        mut session,
    } = prepare_run(&config, &mut renderer);

    if let Some(log) = session.as_mut() {
        log.record_note("source: cli");
        log.record_user(&prompt);
    }

    let result = {
        let mut observers = (&mut renderer, &mut session);
        agent.send(&prompt, &mut observers).await
    };

    match result {
        Ok(report) => {
            if report.text.trim().is_empty() {
                renderer.warn("model finished without a text reply");
            }
            0
        }
        Err(err) => {
            if let Some(log) = session.as_mut() {
                log.record_error(&err.to_string());
            }
            renderer.error(&err.to_string());
            1
        }
    }
}
