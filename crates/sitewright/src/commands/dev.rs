//! Development server command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sitewright_pipeline::{Pipeline, Sequence};
use sitewright_server::{DevServer, DevServerConfig, ReloadHub, WatchLoop};

use crate::config::{ProjectConfig, ServerSettings};

/// Command-line overrides for the `[server]` section.
#[derive(Debug, Clone)]
pub struct DevOptions {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub open: bool,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            port: None,
            host: None,
            open: true,
        }
    }
}

impl DevOptions {
    fn apply(self, settings: ServerSettings) -> ServerSettings {
        ServerSettings {
            port: self.port.unwrap_or(settings.port),
            host: self.host.unwrap_or(settings.host),
            open: self.open && settings.open,
        }
    }
}

/// Build into the development tree, then serve and watch until Ctrl-C.
pub async fn run(root: &Path, config: ProjectConfig, options: DevOptions) -> Result<()> {
    let settings = options.apply(config.server);
    let ctx = Sequence::Default.context(root, Arc::new(config.registry));

    let report = Pipeline::assets()
        .run(&ctx)
        .await
        .context("Initial build failed")?;
    super::log_report(&report);

    tracing::info!("Starting development server on port {}", settings.port);

    let hub = ReloadHub::new();
    let server = DevServer::new(
        DevServerConfig {
            root: ctx.output_root(),
            port: settings.port,
            host: settings.host,
            open: settings.open,
        },
        hub.clone(),
    );
    let watch = WatchLoop::new(ctx, hub);

    tokio::select! {
        result = server.start() => result?,
        result = watch.run() => result?,
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
