//! Interactive REPL mode.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::app::startup::{prepare_run, render_startup_banner, RunSetup};
use deskpilot::agent::Agent;
use deskpilot::config::{Config, ConfigSource};
use deskpilot::render::Renderer;
use deskpilot::session::SessionLog;

const HELP_TEXT: &str = "\
/reset  forget the conversation so far
/exit   quit (also /quit, Ctrl-D, or Ctrl-C at the prompt)
/help   show this list
Ctrl-C while the agent works interrupts the run and clears the conversation.";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Prompt(&'a str),
    Reset,
    Exit,
    Help,
    Unknown(&'a str),
}

/// Outcome of waiting for the next line at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum PromptRead {
    Line(String),
    Closed,
    Interrupted,
}

async fn read_prompt_line<R, F>(lines: &mut Lines<R>, interrupt: F) -> io::Result<PromptRead>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        line = lines.next_line() => Ok(match line? {
            Some(line) => PromptRead::Line(line),
            None => PromptRead::Closed,
        }),
        _ = interrupt => Ok(PromptRead::Interrupted),
    }
}

fn parse_repl_input(line: &str) -> Option<ReplInput<'_>> {
    let input = line.trim();
    if input.is_empty() {
        return None;
    }
    if !input.starts_with('/') {
        return Some(ReplInput::Prompt(input));
    }
    let command = input.split_whitespace().next().unwrap_or(input);
    Some(match command {
        "/reset" | "/clear" => ReplInput::Reset,
        "/exit" | "/quit" => ReplInput::Exit,
        "/help" => ReplInput::Help,
        other => ReplInput::Unknown(other),
    })
}

/// Read prompts from stdin until `/exit` or end of input.
pub(crate) async fn run_repl_mode(config: Config, source: &ConfigSource) -> i32 {
    let mut renderer = Renderer::new(&config.display);
    let setup = prepare_run(&config, &mut renderer);
    render_startup_banner(&mut renderer, &config, &setup, source);
    let RunSetup {
        mut agent,
        mut session,
    } = setup;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        renderer.prompt();
        // Once a run has listened for Ctrl-C the default handler is gone,
        // so the idle prompt listens too.
        let line = match read_prompt_line(&mut lines, tokio::signal::ctrl_c()).await {
            Ok(PromptRead::Line(line)) => line,
            Ok(PromptRead::Closed) => break,
            Ok(PromptRead::Interrupted) => {
                renderer.info("");
                break;
            }
            Err(err) => {
                renderer.error(&format!("failed to read input: {err}"));
                return 1;
            }
        };

        match parse_repl_input(&line) {
            None => {}
            Some(ReplInput::Exit) => break,
            Some(ReplInput::Help) => renderer.info(HELP_TEXT),
            Some(ReplInput::Unknown(command)) => {
                renderer.warn(&format!("unknown command: {command} (try /help)"));
            }
            Some(ReplInput::Reset) => {
                agent.reset();
                if let Some(log) = session.as_mut() {
                    log.record_note("conversation reset");
                }
                renderer.info("conversation cleared");
            }
            Some(ReplInput::Prompt(prompt)) => {
                run_prompt(&mut agent, &mut renderer, &mut session, prompt).await;
            }
        }
    }
    0
}

async fn run_prompt(
    agent: &mut Agent,
    renderer: &mut Renderer,
    session: &mut Option<SessionLog>,
    prompt: &str,
) {
    if let Some(log) = session.as_mut() {
        log.record_user(prompt);
    }

    let outcome = {
        let mut observers = (&mut *renderer, &mut *session);
        tokio::select! {
            result = agent.send(prompt, &mut observers) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    match outcome {
        Some(Ok(_)) => {}
        Some(Err(err)) => {
            if let Some(log) = session.as_mut() {
                log.record_error(&err.to_string());
            }
            renderer.error(&err.to_string());
        }
        None => {
            // The dropped run took the history with it.
            agent.reset();
            if let Some(log) = session.as_mut() {
                log.record_note("run interrupted; conversation reset");
            }
            renderer.warn("interrupted; conversation cleared");
        }
    }
}
