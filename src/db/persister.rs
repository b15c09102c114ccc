use crate::chain::organization::ProposalType;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrganization {
    pub org_address: String,
    pub org_hash: String,
    pub proposal_type: ProposalType,
    pub release_threshold: Value,
    pub left_org_info: Value,
    pub creator: String,
    pub tx_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProposer {
    pub org_address: String,
    pub proposer: String,
    pub proposal_type: ProposalType,
    pub related_tx_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrganizationUpdate {
    pub org_address: String,
    pub org_hash: String,
    pub release_threshold: Value,
    pub left_org_info: Value,
    pub updated_at: NaiveDateTime,
}

/// One relational change derived from organization events.
#[derive(Clone, Debug, PartialEq)]
pub enum OrganizationWrite {
    Create {
        organization: NewOrganization,
        proposers: Vec<NewProposer>,
    },
    Update(OrganizationUpdate),
    /// Deletes every proposer of the organization, then inserts `proposers`.
    ReplaceProposers {
        org_address: String,
        proposers: Vec<NewProposer>,
    },
}

/// Storage used by the organization projection.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn organization_exists(&self, org_address: &str) -> Result<bool>;

    async fn token_decimals(&self, symbol: &str) -> Result<u32>;

    /// Applies `writes` in order inside a single transaction. Either all of
    /// them are committed or none.
    async fn apply(&self, writes: Vec<OrganizationWrite>) -> Result<()>;
}
