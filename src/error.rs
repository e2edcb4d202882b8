//! Unified error types for the agent.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Errors arising from tool execution.
///
/// Every variant is recoverable: the registry turns it into an error-bearing
/// tool result that is fed back to the model.
#[derive(Debug)]
pub enum ToolError {
    /// The model supplied parameters the tool couldn't use.
    InvalidArguments(String),
    /// The tool ran but encountered a failure.
    ExecutionFailed(String),
    /// The target path is inside a protected directory.
    AccessDenied(String),
    /// A file or edit target was not found.
    NotFound(String),
    /// An edit target matched more than once.
    Ambiguous(String),
    /// The command matched a denylist entry and was never started.
    Blocked(String),
    /// The command exceeded its time limit and was terminated.
    TimedOut(Duration),
    /// The command exited with a non-zero status.
    CommandFailed {
        exit_code: i32,
        stderr: String,
        stdout: String,
    },
}

impl ToolError {
    /// Output collected before the failure, if any.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stdout, .. } if !stdout.is_empty() => Some(stdout),
            _ => None,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            Self::ExecutionFailed(msg) => write!(f, "execution failed: {msg}"),
            Self::AccessDenied(msg) => write!(f, "access denied: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Ambiguous(msg) => write!(f, "ambiguous edit: {msg}"),
            Self::Blocked(msg) => write!(f, "command blocked: {msg}"),
            Self::TimedOut(limit) => {
                write!(f, "command timed out after {:.1} seconds", limit.as_secs_f64())
            }
            Self::CommandFailed {
                exit_code, stderr, ..
            } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    write!(f, "command failed with exit code {exit_code}")
                } else {
                    write!(f, "command failed with exit code {exit_code}: {stderr}")
                }
            }
        }
    }
}

impl std::error::Error for ToolError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Errors from the HTTP API layer.
#[derive(Debug)]
pub enum ApiError {
    /// Network / reqwest-level error.
    Http(reqwest::Error),
    /// Non-2xx status from the API.
    Status {
        code: u16,
        body: String,
        retry_after_secs: Option<u64>,
    },
    /// The API answered 2xx but the payload could not be understood.
    InvalidResponse(String),
}

impl ApiError {
    pub fn status(code: u16, body: String, retry_after_secs: Option<u64>) -> Self {
        Self::Status {
            code,
            body,
            retry_after_secs,
        }
    }

    /// HTTP status code for status errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Server-provided `Retry-After` hint in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status { code, body, .. } => write!(f, "status {code}: {body}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// AgentError
// ---------------------------------------------------------------------------

/// Top-level error type for a conversation run.
#[derive(Debug)]
pub enum AgentError {
    Config(ConfigError),
    Api(ApiError),
    /// The run stopped at the configured turn cap.
    TurnLimitReached(usize),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Api(e) => write!(f, "api: {e}"),
            Self::TurnLimitReached(turns) => {
                write!(f, "conversation stopped after {turns} model turns")
            }
        }
    }
}

impl std::error::Error for AgentError {}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ApiError> for AgentError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}
