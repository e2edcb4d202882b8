//! Default configuration constants.
//!
//! Callers share these constants instead of duplicating literals.

/// Default Anthropic API base URL (without the `/v1/messages` path).
pub(crate) const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
/// Default provider model ID.
pub(crate) const DEFAULT_MODEL_ID: &str = "claude-3-7-sonnet-20250219";
/// Default output-token ceiling per model turn.
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default timeout for model API requests.
pub(crate) const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
/// Value sent in the `anthropic-version` header.
pub(crate) const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
/// Total attempts per API request, including the first.
pub(crate) const DEFAULT_API_MAX_ATTEMPTS: u32 = 3;

/// Default limit for one shell command.
pub(crate) const DEFAULT_SHELL_TIMEOUT_SECS: u64 = 30;

/// Screen size the model addresses coordinates in.
pub(crate) const DEFAULT_REFERENCE_WIDTH: u32 = 1920;
pub(crate) const DEFAULT_REFERENCE_HEIGHT: u32 = 1080;
/// Settle time between an input action and the follow-up screenshot.
pub(crate) const DEFAULT_SCREENSHOT_DELAY_MS: u64 = 500;

/// Default listen address for `deskpilot serve`.
pub(crate) const DEFAULT_SERVER_BIND: &str = "127.0.0.1:8765";

/// Command substrings that are never executed.
pub fn default_shell_denylist() -> Vec<String> {
    [
        "format",
        "deltree",
        "rmdir /s",
        "rd /s",
        "rm -rf /",
        "fdisk",
        "diskpart",
        "clear-disk",
        "reg delete",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
