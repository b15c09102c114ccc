pub mod indexer;
pub mod indexer_registry;
pub mod organization_indexer;
