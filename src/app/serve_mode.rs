//! HTTP server mode.

use deskpilot::config::Config;
use deskpilot::render::Renderer;
use deskpilot::server::{serve, PromptServer};

/// Serve `/v1/prompt` until the process is stopped.
pub(crate) async fn run_serve_mode(config: Config, bind: Option<String>) -> i32 {
    let mut renderer = Renderer::new(&config.display);
    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    renderer.header(&config.api.model, &format!("serving http://{addr}"));

    if let Err(err) = serve(PromptServer::from_config(config), &addr).await {
        renderer.error(&format!("server failed on {addr}: {err}"));
        return 1;
    }
    0
}
