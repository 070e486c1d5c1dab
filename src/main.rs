use anyhow::Result;
use follow_checker::{
    router, AppState, ClientRateLimiter, ProxyConfig, ProxyService, UpstreamClient,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        info!("tokio-console enabled on port 6669");
    } else {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,follow_checker=debug"));
        fmt().with_env_filter(env_filter).with_target(true).init();
    }

    let config = ProxyConfig::from_env();

    let cancellation_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();

    let limiter = Arc::new(ClientRateLimiter::from_config(&config.rate_limit));
    limiter.spawn_sweeper(
        config.rate_limit.sweep_interval,
        &task_tracker,
        cancellation_token.clone(),
    );

    let upstream = UpstreamClient::new(config.upstream.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create upstream client: {e}"))?;

    let service = Arc::new(ProxyService::new(
        limiter,
        Arc::new(upstream),
        config.upstream.page_size,
        config.upstream.max_pages,
    ));

    let state = AppState {
        service,
        service_name: config.service_name.clone(),
    };
    let app = router(state, &config.allowed_origins);

    println!("\n{} starting", config.service_name);
    println!("Listening: http://{}", config.bind_addr);
    println!("\nConfiguration:");
    println!("- Upstream: {}", config.upstream.base_url);
    println!(
        "- Pages: {} x {} items",
        config.upstream.max_pages, config.upstream.page_size
    );
    println!(
        "- Rate limit: {} requests per {:?}",
        config.rate_limit.max_requests, config.rate_limit.window
    );
    println!("- Allowed origins: {}", config.allowed_origins.join(", "));

    let shutdown_token = cancellation_token.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Shutdown signal received, stopping services...");
        shutdown_token.cancel();
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server stopped, shutting down services...");
    cancellation_token.cancel();
    task_tracker.close();

    match tokio::time::timeout(Duration::from_secs(10), task_tracker.wait()).await {
        Ok(()) => info!("All background tasks completed successfully"),
        Err(_) => {
            error!("Timeout waiting for background tasks to complete");
            std::process::exit(1);
        }
    }

    info!("Clean shutdown complete");

    Ok(())
}
