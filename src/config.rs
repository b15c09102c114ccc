use clap::{Arg, ArgMatches, Command};
use std::env;
use std::fmt;

pub struct IndexerConfig {
    pub database_url: String,
    pub parliament_contract_address: String,
    pub association_contract_address: String,
    pub referendum_contract_address: String,
    pub api_listen_address: String,
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub organization_snapshot_file: String,
}

impl IndexerConfig {
    /// Adds the shared `--config` and `--database-url` arguments to `app`,
    /// loads the dotenv file and returns the config with the parsed matches
    /// so binaries can read their own arguments.
    pub fn with_clap(app: Command) -> (Self, ArgMatches) {
        let matches = app
            .arg(
                Arg::new("config")
                    .required(false)
                    .long("config")
                    .takes_value(true)
                    .help("Optionally sets a config file to use"),
            )
            .arg(
                Arg::new("database-url")
                    .required(false)
                    .long("database-url")
                    .takes_value(true)
                    .help("MySQL connection URL"),
            )
            .get_matches();

        let input_file = matches.value_of("config").unwrap_or("");
        if !input_file.is_empty() {
            dotenvy::from_filename(input_file).ok();
        } else {
            dotenvy::dotenv().ok();
        }
        let mut config = Self::init();
        if let Some(database_url) = matches.value_of("database-url") {
            config.database_url = database_url.to_string();
        }
        (config, matches)
    }

    pub fn new() -> Self {
        dotenvy::dotenv().ok();
        Self::init()
    }

    fn init() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mysql://root@localhost:3306/aelf_viewer".to_string());
        let parliament_contract_address =
            env::var("PARLIAMENT_CONTRACT_ADDRESS").unwrap_or_default();
        let association_contract_address =
            env::var("ASSOCIATION_CONTRACT_ADDRESS").unwrap_or_default();
        let referendum_contract_address =
            env::var("REFERENDUM_CONTRACT_ADDRESS").unwrap_or_default();
        let api_listen_address =
            env::var("API_LISTEN_ADDRESS").unwrap_or_else(|_| "127.0.0.1:7740".to_string());

        let default_page_size: u64 = env::var("DEFAULT_PAGE_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .unwrap_or(10);

        let max_page_size: u64 = env::var("MAX_PAGE_SIZE")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u64>()
            .unwrap_or(100);

        let organization_snapshot_file = env::var("ORGANIZATION_SNAPSHOT_FILE")
            .unwrap_or_else(|_| "organizations.json".to_string());

        IndexerConfig {
            database_url,
            parliament_contract_address,
            association_contract_address,
            referendum_contract_address,
            api_listen_address,
            default_page_size,
            max_page_size,
            organization_snapshot_file,
        }
    }
}

impl fmt::Display for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IndexerConfig: database_url: {}\n\
        parliament_contract_address: {}\n\
        association_contract_address: {}\n\
        referendum_contract_address: {}\n\
        api_listen_address: {}\n\
        default_page_size: {}\n\
        max_page_size: {}\n\
        organization_snapshot_file: {}\n",
            self.database_url,
            self.parliament_contract_address,
            self.association_contract_address,
            self.referendum_contract_address,
            self.api_listen_address,
            self.default_page_size,
            self.max_page_size,
            self.organization_snapshot_file
        )
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::new()
    }
}
