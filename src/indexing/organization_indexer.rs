use super::indexer::Indexer;
use super::indexer_registry::{IndexerRegistry, Register, RegistryKey};
use crate::chain::transaction::{
    ScannedTransaction, ORGANIZATION_CREATED, ORGANIZATION_MEMBER_CHANGED,
    ORGANIZATION_THRESHOLD_CHANGED, ORGANIZATION_WHITE_LIST_CHANGED,
};
use crate::util::organization::OrganizationProjector;
use async_trait::async_trait;
use std::slice::Iter;
use std::sync::Arc;

const CREATED_INDEXER_KEY: &str = "OrganizationCreatedIndexer";
const UPDATED_INDEXER_KEY: &str = "OrganizationUpdatedIndexer";

pub struct OrganizationCreatedIndexer {
    projector: Arc<OrganizationProjector>,
    registry_keys: Vec<RegistryKey>,
}

impl OrganizationCreatedIndexer {
    pub fn new(projector: Arc<OrganizationProjector>) -> Self {
        OrganizationCreatedIndexer {
            projector,
            registry_keys: vec![RegistryKey::new(ORGANIZATION_CREATED)],
        }
    }
}

#[async_trait]
impl Indexer for OrganizationCreatedIndexer {
    fn id(&self) -> String {
        CREATED_INDEXER_KEY.to_string()
    }

    fn registry_keys(&self) -> Iter<RegistryKey> {
        self.registry_keys.iter()
    }

    async fn index(&self, tx: &ScannedTransaction) -> anyhow::Result<()> {
        self.projector.organization_created_insert(tx).await?;
        Ok(())
    }
}

/// Handles whitelist, member and threshold changes together so that one
/// transaction's updates share a database transaction.
pub struct OrganizationUpdatedIndexer {
    projector: Arc<OrganizationProjector>,
    registry_keys: Vec<RegistryKey>,
}

impl OrganizationUpdatedIndexer {
    pub fn new(projector: Arc<OrganizationProjector>) -> Self {
        OrganizationUpdatedIndexer {
            projector,
            registry_keys: vec![
                RegistryKey::new(ORGANIZATION_WHITE_LIST_CHANGED),
                RegistryKey::new(ORGANIZATION_MEMBER_CHANGED),
                RegistryKey::new(ORGANIZATION_THRESHOLD_CHANGED),
            ],
        }
    }
}

#[async_trait]
impl Indexer for OrganizationUpdatedIndexer {
    fn id(&self) -> String {
        UPDATED_INDEXER_KEY.to_string()
    }

    fn registry_keys(&self) -> Iter<RegistryKey> {
        self.registry_keys.iter()
    }

    async fn index(&self, tx: &ScannedTransaction) -> anyhow::Result<()> {
        self.projector.organization_updated_insert(tx).await?;
        Ok(())
    }
}

pub fn register_organization_indexers(
    registry: &mut IndexerRegistry,
    projector: Arc<OrganizationProjector>,
) {
    registry.register(
        Box::from(OrganizationCreatedIndexer::new(projector.clone())),
        None,
    );
    registry.register(Box::from(OrganizationUpdatedIndexer::new(projector)), None);
}
