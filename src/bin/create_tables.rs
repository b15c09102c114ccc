use clap::{Arg, Command};
use env_logger::Env;
use sea_orm::DatabaseBackend;

use contract_viewer::config::IndexerConfig;
use contract_viewer::db::connection::establish_connection;
use contract_viewer::db::db_builder::DatabaseBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Command::new("Create Tables")
        .version("0.1.0")
        .about("Creates the viewer schema")
        .arg(
            Arg::new("print")
                .required(false)
                .long("print")
                .takes_value(false)
                .help("Print the SQL instead of executing it"),
        );
    let (config, matches) = IndexerConfig::with_clap(app);

    let env = Env::default()
        .filter_or("INDEXER_LOG_LEVEL", "info")
        .write_style_or("INDEXER_LOG_STYLE", "always");

    env_logger::init_from_env(env);

    let builder = DatabaseBuilder::viewer_schema(DatabaseBackend::MySql);
    if matches.is_present("print") {
        println!("{};", builder.sql_string());
        return Ok(());
    }
    let db = establish_connection(&config.database_url).await?;
    builder.create_tables(&db).await?;
    Ok(())
}
