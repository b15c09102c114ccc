use super::indexer::Indexer;
use crate::chain::transaction::ScannedTransaction;
use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegistryKey(String);

impl RegistryKey {
    pub fn new(key: &str) -> Self {
        RegistryKey(key.to_string())
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for RegistryKey {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

pub trait Register {
    fn register(&mut self, indexer: Box<dyn Indexer>, registry_key: Option<&str>);
}

#[derive(Default)]
pub struct IndexerRegistry {
    /// Maps event names to ids of indexers
    handlers: HashMap<RegistryKey, Vec<usize>>,
    indexers: Vec<Box<dyn Indexer>>,
    /// Event names seen without a handler, reported once each.
    unhandled: Mutex<HashSet<String>>,
}

impl IndexerRegistry {
    pub fn new() -> Self {
        IndexerRegistry::default()
    }

    pub fn register_for_key(&mut self, registry_key: &str, indexer_id: usize) {
        let handlers = self
            .handlers
            .entry(RegistryKey::new(registry_key))
            .or_insert_with(Vec::new);
        if !handlers.contains(&indexer_id) {
            handlers.push(indexer_id);
        }
    }

    pub fn indexers_for_key(&self, registry_key: &str) -> Option<&Vec<usize>> {
        self.handlers.get(&RegistryKey::new(registry_key))
    }

    pub fn get_indexer(&self, id: usize) -> Option<&dyn Indexer> {
        self.indexers.get(id).map(|indexer| indexer.as_ref())
    }

    fn note_unhandled(&self, name: &str) {
        if let Ok(mut unhandled) = self.unhandled.lock() {
            if unhandled.insert(name.to_string()) {
                debug!("no indexer registered for {}", name);
            }
        }
    }

    /// Ids of the indexers interested in any log of `tx`, in registration order.
    pub fn indexers_for_transaction(&self, tx: &ScannedTransaction) -> Vec<usize> {
        let mut ids = BTreeSet::new();
        for name in tx.log_names() {
            match self.indexers_for_key(name) {
                Some(handlers) => ids.extend(handlers.iter().copied()),
                None => self.note_unhandled(name),
            }
        }
        ids.into_iter().collect()
    }

    /// Runs every interested indexer once for `tx`. Returns how many ran.
    pub async fn index_transaction(&self, tx: &ScannedTransaction) -> anyhow::Result<usize> {
        let ids = self.indexers_for_transaction(tx);
        for id in ids.iter() {
            if let Some(indexer) = self.get_indexer(*id) {
                debug!("{} indexing {}", indexer.id(), tx.transaction_id);
                indexer.index(tx).await?;
            }
        }
        Ok(ids.len())
    }
}

impl Register for IndexerRegistry {
    fn register(&mut self, indexer: Box<dyn Indexer>, registry_key: Option<&str>) {
        let id = self.indexers.len();
        if let Some(registry_key) = registry_key {
            self.register_for_key(registry_key, id);
        }
        let keys: Vec<RegistryKey> = indexer.registry_keys().cloned().collect();
        for registry_key in keys.iter() {
            debug!("registering {} for {}", indexer.id(), registry_key);
            self.register_for_key(registry_key, id);
        }
        self.indexers.push(indexer);
    }
}
