use anyhow::Context;
use inventory_service::rpc::InventoryRpc;
use inventory_service::{app, config, AppState, EventSink};
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    tracing_subscriber::fmt().with_env_filter(cfg.log_level.as_str()).init();

    let statement_timeout_ms = cfg.db_statement_timeout_ms;
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                // Server-side bound on lock hold time.
                sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&cfg.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    #[cfg(feature = "kafka")]
    let sink: Arc<dyn EventSink> =
        Arc::new(inventory_service::events::KafkaEventSink::from_env()?);
    #[cfg(not(feature = "kafka"))]
    let sink: Arc<dyn EventSink> = Arc::new(inventory_service::LogEventSink);

    let state = AppState::new(pool, sink);

    let ip: std::net::IpAddr = cfg.host.parse()?;
    let http_addr = SocketAddr::from((ip, cfg.http_port));
    let rpc_addr = SocketAddr::from((ip, cfg.rpc_port));
    tracing::info!(%http_addr, %rpc_addr, "starting inventory-service");

    let listener = TcpListener::bind(http_addr).await?;
    let http = axum::serve(listener, app::build_router(state.clone())).into_future();
    let rpc = tonic::transport::Server::builder()
        .concurrency_limit_per_connection(cfg.rpc_worker_pool)
        .add_service(InventoryRpc::new(state).into_server())
        .serve(rpc_addr);

    tokio::select! {
        result = http => result.context("http server exited")?,
        result = rpc => result.context("rpc server exited")?,
    }
    Ok(())
}
