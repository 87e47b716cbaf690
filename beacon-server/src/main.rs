use clap::Parser;
use beacon_core::config::StoreBackend;
use beacon_core::BeaconConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use beacon_server::server;
use beacon_server::services::Services;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "beacon.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is a dev convenience; production uses real env vars
    dotenvy::dotenv().ok();

    let args = Args::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match BeaconConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    let pool = match config.store.backend {
        StoreBackend::Postgres => {
            let pool = match beacon_core::db::create_pool(&config.database).await {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Failed to connect to database: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = beacon_core::db::migrate(&pool).await {
                eprintln!("Failed to run migrations: {}", e);
                std::process::exit(1);
            }
            Some(pool)
        }
        StoreBackend::Memory => None,
    };

    if args.health {
        match &pool {
            Some(pool) => match beacon_core::db::health_check(pool).await {
                Ok(v) => println!("✅ PostgreSQL connected: {}", v),
                Err(e) => {
                    println!("❌ PostgreSQL connection failed: {}", e);
                    std::process::exit(1);
                }
            },
            None => println!("✅ Memory store selected, no database to check"),
        }
        println!("✅ Beacon health check passed");
        return Ok(());
    }

    let services = Services::from_config(&config, pool)?;

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    if config.http.enabled {
        let http_services = services.clone();
        let http_config = config.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) =
                beacon_server::http::start_http_server(http_services, http_config, http_shutdown)
                    .await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    server::run_unix_server(&socket_path, services, tx.subscribe()).await?;

    Ok(())
}
