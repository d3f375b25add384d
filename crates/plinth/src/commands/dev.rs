//! Top-level entry: build, and in development also watch and serve.

use std::sync::Arc;

use anyhow::{Context, Result};
use plinth_pipeline::{plan_services, Service, SiteBuilder, TaskRunner};
use plinth_server::{DevServer, ReloadHub};
use tokio::task::JoinSet;

use super::build::log_summary;
use super::Settings;

/// Run the services planned for the current mode concurrently.
pub async fn run(settings: Settings, port: Option<u16>, open: bool) -> Result<()> {
    let hub = ReloadHub::new();
    let ctx = settings
        .context
        .clone()
        .with_reload(Arc::new(hub.clone()));
    let runner = TaskRunner::new(ctx.clone());

    let mut services: JoinSet<Result<()>> = JoinSet::new();
    for service in plan_services(ctx.mode) {
        tracing::debug!("Starting {}", service);
        match service {
            Service::Build => {
                let builder = SiteBuilder::new(ctx.clone());
                services.spawn(async move {
                    let summary = builder.build().await?;
                    log_summary(&summary);
                    Ok(())
                });
            }
            Service::Watch => {
                let routes = ctx.routes.clone();
                let runner = runner.clone();
                services.spawn(async move {
                    plinth_server::watch(routes, runner).await?;
                    Ok(())
                });
            }
            Service::DevServer => {
                let config = settings.config.server(ctx.routes.build_root(), port, open);
                let server = DevServer::new(config, hub.clone());
                services.spawn(async move {
                    server.start().await?;
                    Ok(())
                });
            }
        }
    }

    while let Some(joined) = services.join_next().await {
        joined.context("Service panicked")??;
    }
    Ok(())
}

/// Watch and re-run tasks without serving.
pub async fn watch_only(settings: Settings) -> Result<()> {
    let ctx = settings.context;
    let runner = TaskRunner::new(ctx.clone());
    plinth_server::watch(ctx.routes.clone(), runner).await?;
    Ok(())
}
