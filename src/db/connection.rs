use anyhow::Context;
use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub async fn establish_connection(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .with_context(|| "Failed to connect to the database".to_string())?;
    info!("connected to database");
    Ok(db)
}
