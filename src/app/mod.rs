//! Binary-local application orchestration helpers.
//!
//! The main binary keeps wiring logic in `main.rs`, while this module hosts
//! the per-mode flows (REPL, one-shot, HTTP server) and their shared setup.

pub(crate) mod entry;
pub(crate) mod exec_mode;
pub(crate) mod repl_mode;
pub(crate) mod serve_mode;
pub(crate) mod startup;
