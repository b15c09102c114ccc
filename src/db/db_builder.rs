use super::entities::{contract_history, contracts, files, organizations, proposers, tokens};
use log::info;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityName, EntityTrait, Schema,
};

/// Collects `CREATE TABLE` statements for the indexed entities. Tables are
/// created in the order they were added, so referenced tables come first.
#[derive(Debug)]
pub struct DatabaseBuilder {
    backend: DatabaseBackend,
    tables: Vec<(String, TableCreateStatement)>,
}

impl DatabaseBuilder {
    pub fn new(backend: DatabaseBackend) -> Self {
        DatabaseBuilder {
            backend,
            tables: vec![],
        }
    }

    /// Builder with every table the viewer uses.
    pub fn viewer_schema(backend: DatabaseBackend) -> Self {
        let mut builder = DatabaseBuilder::new(backend);
        builder
            .add_entity(tokens::Entity)
            .add_entity(organizations::Entity)
            .add_entity(proposers::Entity)
            .add_entity(contracts::Entity)
            .add_entity(files::Entity)
            .add_entity(contract_history::Entity);
        builder
    }

    pub fn add_entity<E: EntityTrait>(&mut self, entity: E) -> &mut Self {
        let table_name = entity.table_name().to_string();
        let schema = Schema::new(self.backend);
        let statement = schema
            .create_table_from_entity(entity)
            .if_not_exists()
            .to_owned();
        self.tables.push((table_name, statement));
        self
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Use the table definitions to physically build the database.
    pub async fn create_tables(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        let builder = db.get_database_backend();
        for (table_name, table_def) in self.tables.iter() {
            info!("creating table {}", table_name);
            db.execute(builder.build(table_def)).await?;
        }
        Ok(())
    }

    /// Human-readable SQL string for all definitions in this builder.
    pub fn sql_string(&self) -> String {
        self.tables
            .iter()
            .map(|(_, table_def)| self.backend.build(table_def).to_string())
            .collect::<Vec<String>>()
            .join(";\n")
    }
}

#[test]
fn test_db_builder() {
    let builder = DatabaseBuilder::viewer_schema(DatabaseBackend::MySql);
    assert_eq!(
        vec![
            "tokens",
            "organizations",
            "proposers",
            "contracts",
            "files",
            "contract_history"
        ],
        builder.table_names()
    );
    let sql = builder.sql_string();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS `organizations`"));
    assert!(sql.contains("`release_threshold` json"));
    assert!(sql.contains("FOREIGN KEY"));
}
