use clap::Command;
use env_logger::Env;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

use contract_viewer::api::routes::api_router;
use contract_viewer::api::ApiState;
use contract_viewer::config::IndexerConfig;
use contract_viewer::db::connection::establish_connection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Command::new("Contract Viewer")
        .version("0.1.0")
        .about("Contract and organization viewer API");
    let (config, _matches) = IndexerConfig::with_clap(app);

    let env = Env::default()
        .filter_or("INDEXER_LOG_LEVEL", "info")
        .write_style_or("INDEXER_LOG_STYLE", "always");

    env_logger::init_from_env(env);

    let db = establish_connection(&config.database_url).await?;
    let state = ApiState {
        db: Arc::new(db),
        default_page_size: config.default_page_size,
        max_page_size: config.max_page_size,
    };

    let addr: SocketAddr = config.api_listen_address.parse()?;
    info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(api_router(state).into_make_service())
        .await?;
    Ok(())
}
