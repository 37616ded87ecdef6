use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use listings_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    services::{fx_service::FxRefresher, link_checker::LinkChecker},
    AppState,
};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool, config.clone());
    let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

    {
        let refresher = FxRefresher::new(
            http_client.clone(),
            config.fx_api_url.clone(),
            config.fx_api_key.clone(),
            config.available_currencies.clone(),
            app_state.rates.clone(),
        );
        let interval = Duration::from_secs(config.fx_refresh_interval_secs);
        tokio::spawn(async move {
            loop {
                match refresher.refresh().await {
                    Ok(written) => info!(written, "exchange rates refreshed"),
                    Err(e) => tracing::error!(error = ?e, "exchange rate refresh failed"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    {
        let checker = LinkChecker::new(http_client, app_state.listing_service.clone());
        let interval = Duration::from_secs(config.link_check_interval_secs);
        tokio::spawn(async move {
            loop {
                match checker.run_once().await {
                    Ok(expired) => info!(expired, "apply link check finished"),
                    Err(e) => tracing::error!(error = ?e, "apply link check failed"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    {
        let listings = app_state.listing_service.clone();
        let interval = Duration::from_secs(config.tier_check_interval_secs);
        tokio::spawn(async move {
            loop {
                if let Err(e) = listings.demote_lapsed_tiers(Utc::now()).await {
                    tracing::error!(error = ?e, "tier demotion failed");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    let app = routes::api_router()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
