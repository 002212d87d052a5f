//! Raster Preview - on-demand map tiles for local GeoTIFFs.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raster_preview::{
    config::Config,
    server::{create_router, RouterConfig},
    tile::PreviewService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Raster Preview v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Tile size: {}px", config.tile_size);
    info!(
        "  Stretch: {}% - {}%",
        config.stretch_low, config.stretch_high
    );
    if config.cache_max_age == 0 {
        info!("  Cache-Control: no-cache");
    } else {
        info!("  Cache-Control: max-age={}", config.cache_max_age);
    }

    let service = PreviewService::new()
        .with_tile_size(config.tile_size)
        .with_stretch(config.stretch());

    if let Err(e) = register_startup_previews(&service, &config).await {
        error!("Startup registration failed: {}", e);
        return ExitCode::FAILURE;
    }

    let router = create_router(service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/preview/bounds/<id>", addr);
    info!("    curl http://{}/preview/tile/<id>/0/0/0.png -o tile.png", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Register every `id=path` pair given on the command line.
async fn register_startup_previews(service: &PreviewService, config: &Config) -> Result<(), String> {
    for (id, path) in config.registrations()? {
        service
            .register(&id, &path)
            .await
            .map_err(|e| format!("{}: {}", id, e))?;
    }
    Ok(())
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "raster_preview=debug,tower_http=debug"
    } else {
        "raster_preview=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the command-line configuration.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
