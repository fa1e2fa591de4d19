//! Backend entry-point: loads settings, prepares storage and serves the API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{AppSettings, ServerConfig, create_server};
use tourbook::inbound::http::auth_config::{BuildMode, auth_key_from_env};
use tourbook::inbound::http::health::HealthState;
use tourbook::outbound::persistence::{DbPool, PoolConfig, run_migrations};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let auth_key = auth_key_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())?;
    let database_url = settings.database_url.clone();
    let config = ServerConfig::new(settings, auth_key.as_bytes().to_vec());

    let config = match database_url {
        Some(url) => {
            run_migrations(&url).await?;
            let pool = DbPool::new(PoolConfig::new(url)).await?;
            config.with_db_pool(pool)
        }
        None => config,
    };

    #[cfg(feature = "metrics")]
    let config = config.with_metrics(server::build_metrics());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!("tourbook API listening");
    server.await?;
    Ok(())
}
