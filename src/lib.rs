//! Deskpilot: a desktop-automation agent for the Anthropic Messages API.
//!
//! The model drives the host machine through a small set of tools: a
//! `computer` tool for screenshots, mouse and keyboard, a `shell` tool, and
//! file read/write/edit tools guarded by a protected-path policy. The same
//! conversation loop backs the interactive REPL, one-shot prompts and the
//! HTTP server.
//!
//! # Quick start
//!
//! ```no_run
//! use deskpilot::agent::Agent;
//! use deskpilot::config::load_config;
//! use deskpilot::tools::builtin_registry;
//!
//! # async fn example() {
//! let config = load_config(None).unwrap();
//! let tools = builtin_registry(&config, None, None);
//! let mut agent = Agent::new(&config, tools);
//! let report = agent.send("List the files on my desktop.", &mut ()).await.unwrap();
//! println!("{}", report.text);
//! # }
//! ```

pub mod agent;
pub mod api;
pub mod build_info;
pub mod config;
pub mod error;
pub mod prompt;
pub mod render;
pub mod server;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod tools;
pub mod types;
