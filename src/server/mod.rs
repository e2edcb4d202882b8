//! HTTP front end.
//!
//! `POST /v1/prompt` runs one conversation from an empty history and returns
//! the final assistant text plus every screenshot taken along the way. There
//! is only one desktop, so runs are serialized behind a lock.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::api::{ApiClient, ModelClient};
use crate::config::Config;
use crate::tools::computer::native_desktop;
use crate::tools::{builtin_registry, ToolRegistry};

mod handlers;

pub use handlers::{create_router, PromptRequest, PromptResponse};

/// Builds a fresh tool registry for one run. The argument is the directory
/// screenshots should be saved to, if any.
pub type ToolFactory = Arc<dyn Fn(Option<&Path>) -> ToolRegistry + Send + Sync>;

/// Shared state behind every request.
pub struct PromptServer {
    config: Config,
    client: Arc<dyn ModelClient>,
    tools: ToolFactory,
    run_lock: Mutex<()>,
}

impl PromptServer {
    pub fn new(config: Config, client: Arc<dyn ModelClient>, tools: ToolFactory) -> Self {
        Self {
            config,
            client,
            tools,
            run_lock: Mutex::new(()),
        }
    }

    /// Server backed by the configured API and the built-in tools.
    pub fn from_config(config: Config) -> Self {
        let desktop = if config.tools.computer_enabled {
            match native_desktop() {
                Ok(desktop) => Some(desktop),
                Err(err) => {
                    tracing::warn!(error = %err, "computer tool unavailable");
                    None
                }
            }
        } else {
            None
        };
        let client: Arc<dyn ModelClient> = Arc::new(ApiClient::new(&config.api));
        let tool_config = config.clone();
        let tools: ToolFactory = Arc::new(move |screenshot_dir| {
            builtin_registry(&tool_config, desktop.clone(), screenshot_dir)
        });
        Self::new(config, client, tools)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(server: PromptServer, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, create_router(Arc::new(server))).await
}
