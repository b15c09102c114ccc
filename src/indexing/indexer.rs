use super::indexer_registry::RegistryKey;
use crate::chain::transaction::ScannedTransaction;
use async_trait::async_trait;
use std::slice::Iter;

#[async_trait]
pub trait Indexer: Send + Sync {
    fn id(&self) -> String;
    /// Event names this indexer handles.
    fn registry_keys(&self) -> Iter<RegistryKey>;
    async fn index(&self, tx: &ScannedTransaction) -> anyhow::Result<()>;
}
