use clap::{Arg, Command};
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use contract_viewer::chain::organization::{ProposalContracts, SnapshotOrganizationReader};
use contract_viewer::config::IndexerConfig;
use contract_viewer::db::connection::establish_connection;
use contract_viewer::db::db_persister::DatabasePersister;
use contract_viewer::indexing::indexer_registry::IndexerRegistry;
use contract_viewer::indexing::organization_indexer::register_organization_indexers;
use contract_viewer::ingest::ingest_transactions;
use contract_viewer::util::organization::OrganizationProjector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app = Command::new("Organization Indexer")
        .version("0.1.0")
        .about("Projects organization events into the viewer database")
        .arg(
            Arg::new("input")
                .required(false)
                .long("input")
                .takes_value(true)
                .help("Newline-delimited transaction records, stdin when omitted"),
        )
        .arg(
            Arg::new("organizations")
                .required(false)
                .long("organizations")
                .takes_value(true)
                .help("Organization snapshot JSON, overrides ORGANIZATION_SNAPSHOT_FILE"),
        );
    let (config, matches) = IndexerConfig::with_clap(app);

    let env = Env::default()
        .filter_or("INDEXER_LOG_LEVEL", "info")
        .write_style_or("INDEXER_LOG_STYLE", "always");

    env_logger::init_from_env(env);
    info!("{}", config);

    let snapshot_file = matches
        .value_of("organizations")
        .unwrap_or(&config.organization_snapshot_file);
    let reader = SnapshotOrganizationReader::from_file(snapshot_file)?;
    info!("{} organizations in snapshot", reader.len());

    let db = establish_connection(&config.database_url).await?;
    let projector = Arc::new(OrganizationProjector::new(
        Arc::new(reader),
        Arc::new(DatabasePersister::new(db)),
        ProposalContracts::from_config(&config),
    ));
    let mut registry = IndexerRegistry::new();
    register_organization_indexers(&mut registry, projector);

    let stats = match matches.value_of("input") {
        Some(path) => ingest_transactions(&registry, BufReader::new(File::open(path)?)).await?,
        None => ingest_transactions(&registry, io::stdin().lock()).await?,
    };
    if stats.failed > 0 {
        anyhow::bail!("{} of {} records failed", stats.failed, stats.read);
    }
    Ok(())
}
