use super::entities::{organizations, proposers, tokens};
use super::persister::{
    NewOrganization, NewProposer, OrganizationStore, OrganizationUpdate, OrganizationWrite,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};

impl From<&NewOrganization> for organizations::ActiveModel {
    fn from(org: &NewOrganization) -> Self {
        organizations::ActiveModel {
            org_address: Set(org.org_address.clone()),
            org_hash: Set(org.org_hash.clone()),
            proposal_type: Set(org.proposal_type.to_string()),
            release_threshold: Set(org.release_threshold.clone()),
            left_org_info: Set(org.left_org_info.clone()),
            creator: Set(org.creator.clone()),
            tx_id: Set(org.tx_id.clone()),
            created_at: Set(org.created_at),
            updated_at: Set(org.updated_at),
            ..Default::default()
        }
    }
}

impl From<&NewProposer> for proposers::ActiveModel {
    fn from(proposer: &NewProposer) -> Self {
        proposers::ActiveModel {
            org_address: Set(proposer.org_address.clone()),
            proposer: Set(proposer.proposer.clone()),
            proposal_type: Set(proposer.proposal_type.to_string()),
            related_tx_id: Set(proposer.related_tx_id.clone()),
            ..Default::default()
        }
    }
}

impl From<&OrganizationUpdate> for organizations::ActiveModel {
    fn from(update: &OrganizationUpdate) -> Self {
        organizations::ActiveModel {
            org_hash: Set(update.org_hash.clone()),
            release_threshold: Set(update.release_threshold.clone()),
            left_org_info: Set(update.left_org_info.clone()),
            updated_at: Set(update.updated_at),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct DatabasePersister {
    db: DatabaseConnection,
}

impl DatabasePersister {
    pub fn new(db: DatabaseConnection) -> Self {
        DatabasePersister { db }
    }
}

async fn insert_proposers<C: ConnectionTrait>(db: &C, proposers: &[NewProposer]) -> Result<()> {
    if proposers.is_empty() {
        return Ok(());
    }
    let models: Vec<proposers::ActiveModel> = proposers.iter().map(Into::into).collect();
    proposers::Entity::insert_many(models).exec(db).await?;
    Ok(())
}

async fn write<C: ConnectionTrait>(db: &C, write: &OrganizationWrite) -> Result<()> {
    match write {
        OrganizationWrite::Create {
            organization,
            proposers,
        } => {
            debug!("creating organization {}", organization.org_address);
            organizations::Entity::insert(organizations::ActiveModel::from(organization))
                .exec(db)
                .await
                .with_context(|| format!("inserting organization {}", organization.org_address))?;
            insert_proposers(db, proposers).await?;
        }
        OrganizationWrite::Update(update) => {
            let result = organizations::Entity::update_many()
                .set(organizations::ActiveModel::from(update))
                .filter(organizations::Column::OrgAddress.eq(update.org_address.as_str()))
                .exec(db)
                .await
                .with_context(|| format!("updating organization {}", update.org_address))?;
            if result.rows_affected == 0 {
                warn!("organization {} is not indexed, update skipped", update.org_address);
            }
        }
        OrganizationWrite::ReplaceProposers {
            org_address,
            proposers,
        } => {
            // proposers reference organizations(org_address)
            let indexed = organizations::Entity::find()
                .filter(organizations::Column::OrgAddress.eq(org_address.as_str()))
                .one(db)
                .await?
                .is_some();
            if !indexed {
                warn!("organization {} is not indexed, proposers skipped", org_address);
                return Ok(());
            }
            proposers::Entity::delete_many()
                .filter(proposers::Column::OrgAddress.eq(org_address.as_str()))
                .exec(db)
                .await
                .with_context(|| format!("deleting proposers of {}", org_address))?;
            insert_proposers(db, proposers).await?;
        }
    }
    Ok(())
}

#[async_trait]
impl OrganizationStore for DatabasePersister {
    async fn organization_exists(&self, org_address: &str) -> Result<bool> {
        let existing = organizations::Entity::find()
            .filter(organizations::Column::OrgAddress.eq(org_address))
            .one(&self.db)
            .await?;
        Ok(existing.is_some())
    }

    async fn token_decimals(&self, symbol: &str) -> Result<u32> {
        let token = tokens::Entity::find()
            .filter(tokens::Column::Symbol.eq(symbol))
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow!("token {} is not indexed", symbol))?;
        u32::try_from(token.decimals)
            .with_context(|| format!("token {} has invalid decimals {}", symbol, token.decimals))
    }

    async fn apply(&self, writes: Vec<OrganizationWrite>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await?;
        for item in writes.iter() {
            write(&txn, item).await?;
        }
        txn.commit().await?;
        debug!("committed {} organization writes", writes.len());
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::chain::organization::ProposalType;
    use chrono::NaiveDateTime;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    fn token(symbol: &str, decimals: i32) -> tokens::Model {
        tokens::Model {
            id: 1,
            symbol: symbol.to_string(),
            token_name: "Native Token".to_string(),
            decimals,
        }
    }

    #[tokio::test]
    async fn test_token_decimals() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![vec![token("ELF", 8)]])
            .into_connection();
        let persister = DatabasePersister::new(db);
        assert_eq!(8, persister.token_decimals("ELF").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_token_is_an_error() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![Vec::<tokens::Model>::new()])
            .into_connection();
        let persister = DatabasePersister::new(db);
        assert!(persister.token_decimals("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn test_apply_create_with_proposers() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 1,
                    rows_affected: 2,
                },
            ])
            .into_connection();
        let persister = DatabasePersister::new(db);
        let time = NaiveDateTime::from_timestamp(1_600_000_000, 0);
        let proposer = |name: &str| NewProposer {
            org_address: "org_a".to_string(),
            proposer: name.to_string(),
            proposal_type: ProposalType::Association,
            related_tx_id: "tx".to_string(),
        };
        persister
            .apply(vec![OrganizationWrite::Create {
                organization: NewOrganization {
                    org_address: "org_a".to_string(),
                    org_hash: "hash".to_string(),
                    proposal_type: ProposalType::Association,
                    release_threshold: json!({"minimalApprovalThreshold": "1"}),
                    left_org_info: json!({}),
                    creator: "creator".to_string(),
                    tx_id: "tx".to_string(),
                    created_at: time,
                    updated_at: time,
                },
                proposers: vec![proposer("alice"), proposer("bob")],
            }])
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_proposers_of_unindexed_organization() -> anyhow::Result<()> {
        // no exec results: any DELETE or INSERT would fail the apply
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![Vec::<organizations::Model>::new()])
            .into_connection();
        let persister = DatabasePersister::new(db);
        persister
            .apply(vec![OrganizationWrite::ReplaceProposers {
                org_address: "org_missing".to_string(),
                proposers: vec![NewProposer {
                    org_address: "org_missing".to_string(),
                    proposer: "alice".to_string(),
                    proposal_type: ProposalType::Association,
                    related_tx_id: "tx".to_string(),
                }],
            }])
            .await?;
        Ok(())
    }
}
