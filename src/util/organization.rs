use super::threshold::rescale_threshold;
use crate::chain::organization::{
    token_symbol, whitelisted_proposers, OrganizationReader, ProposalContracts, ProposalType,
};
use crate::chain::transaction::{
    deserialize_logs, DeserializedLog, ScannedTransaction, ORGANIZATION_CREATED,
    ORGANIZATION_MEMBER_CHANGED, ORGANIZATION_THRESHOLD_CHANGED, ORGANIZATION_WHITE_LIST_CHANGED,
};
use crate::db::persister::{
    NewOrganization, NewProposer, OrganizationStore, OrganizationUpdate, OrganizationWrite,
};
use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use futures::future::try_join_all;
use itertools::Itertools;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// An organization read from the chain, reshaped for the `organizations` table.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedOrganization {
    pub org_address: String,
    pub org_hash: String,
    pub release_threshold: Map<String, Value>,
    pub left_org_info: Map<String, Value>,
    pub created_at: NaiveDateTime,
    pub proposal_type: ProposalType,
    pub creator: String,
    pub tx_id: String,
}

/// Projects organization events into relational rows.
pub struct OrganizationProjector {
    reader: Arc<dyn OrganizationReader>,
    store: Arc<dyn OrganizationStore>,
    contracts: ProposalContracts,
}

fn new_proposers(
    org_address: &str,
    left_org_info: &Map<String, Value>,
    proposal_type: ProposalType,
    tx_id: &str,
) -> Vec<NewProposer> {
    whitelisted_proposers(left_org_info)
        .into_iter()
        .unique()
        .map(|proposer| NewProposer {
            org_address: org_address.to_string(),
            proposer,
            proposal_type,
            related_tx_id: tx_id.to_string(),
        })
        .collect()
}

impl OrganizationProjector {
    pub fn new(
        reader: Arc<dyn OrganizationReader>,
        store: Arc<dyn OrganizationStore>,
        contracts: ProposalContracts,
    ) -> Self {
        OrganizationProjector {
            reader,
            store,
            contracts,
        }
    }

    fn with_proposal_type(&self, log: DeserializedLog) -> Option<(ProposalType, DeserializedLog)> {
        match self.contracts.proposal_type(&log.contract_address) {
            Some(proposal_type) => Some((proposal_type, log)),
            None => {
                warn!(
                    "{} from unknown contract {} ignored",
                    log.name, log.contract_address
                );
                None
            }
        }
    }

    /// Referendum thresholds are stored in whole tokens, the other kinds as
    /// reported by the chain.
    async fn release_threshold(
        &self,
        proposal_type: ProposalType,
        threshold: &Map<String, Value>,
        left_org_info: &Map<String, Value>,
    ) -> anyhow::Result<Value> {
        if proposal_type != ProposalType::Referendum {
            return Ok(Value::Object(threshold.clone()));
        }
        let symbol = token_symbol(left_org_info)
            .ok_or_else(|| anyhow!("referendum organization without tokenSymbol"))?;
        let decimals = self.store.token_decimals(symbol).await?;
        Ok(Value::Object(rescale_threshold(threshold, decimals)?))
    }

    pub async fn organization_created_formatter(
        &self,
        tx: &ScannedTransaction,
    ) -> anyhow::Result<Vec<FormattedOrganization>> {
        let logs = deserialize_logs(&tx.logs, ORGANIZATION_CREATED)?;
        let created_at = tx.timestamp()?;
        let lookups = logs
            .into_iter()
            .filter_map(|log| self.with_proposal_type(log))
            .map(|(proposal_type, log)| async move {
                let org = self
                    .reader
                    .get_organization(proposal_type, &log.organization_address)
                    .await
                    .with_context(|| format!("GetOrganization {}", log.organization_address))?;
                Ok::<_, anyhow::Error>(FormattedOrganization {
                    org_address: org.organization_address,
                    org_hash: org.organization_hash,
                    release_threshold: org.proposal_release_threshold,
                    left_org_info: org.left_org_info,
                    created_at,
                    proposal_type,
                    creator: tx.transaction.from.clone(),
                    tx_id: tx.transaction_id.clone(),
                })
            });
        try_join_all(lookups).await
    }

    /// Inserts organizations that are not indexed yet, with their proposer
    /// whitelist, in one transaction. Returns the number created.
    pub async fn organization_created_inserter(
        &self,
        formatted: Vec<FormattedOrganization>,
    ) -> anyhow::Result<usize> {
        let mut seen = HashSet::new();
        let mut writes = vec![];
        for item in formatted {
            if !seen.insert(item.org_address.clone())
                || self.store.organization_exists(&item.org_address).await?
            {
                debug!("organization {} already indexed", item.org_address);
                continue;
            }
            let proposers = match item.proposal_type {
                ProposalType::Parliament => vec![],
                _ => new_proposers(
                    &item.org_address,
                    &item.left_org_info,
                    item.proposal_type,
                    &item.tx_id,
                ),
            };
            let release_threshold = self
                .release_threshold(item.proposal_type, &item.release_threshold, &item.left_org_info)
                .await?;
            writes.push(OrganizationWrite::Create {
                organization: NewOrganization {
                    org_address: item.org_address,
                    org_hash: item.org_hash,
                    proposal_type: item.proposal_type,
                    release_threshold,
                    left_org_info: Value::Object(item.left_org_info),
                    creator: item.creator,
                    tx_id: item.tx_id,
                    created_at: item.created_at,
                    updated_at: item.created_at,
                },
                proposers,
            });
        }
        let created = writes.len();
        self.store.apply(writes).await?;
        Ok(created)
    }

    pub async fn organization_created_insert(
        &self,
        tx: &ScannedTransaction,
    ) -> anyhow::Result<usize> {
        let formatted = self.organization_created_formatter(tx).await?;
        let created = self.organization_created_inserter(formatted).await?;
        if created > 0 {
            info!("{} organizations created by {}", created, tx.transaction_id);
        }
        Ok(created)
    }

    async fn updated_writes(
        &self,
        tx: &ScannedTransaction,
        proposal_type: ProposalType,
        log: DeserializedLog,
        updated_at: NaiveDateTime,
    ) -> anyhow::Result<Vec<OrganizationWrite>> {
        let org = self
            .reader
            .get_organization(proposal_type, &log.organization_address)
            .await
            .with_context(|| format!("GetOrganization {}", log.organization_address))?;
        let release_threshold = self
            .release_threshold(
                proposal_type,
                &org.proposal_release_threshold,
                &org.left_org_info,
            )
            .await?;
        let mut writes = vec![];
        if log.name == ORGANIZATION_WHITE_LIST_CHANGED {
            writes.push(OrganizationWrite::ReplaceProposers {
                org_address: org.organization_address.clone(),
                proposers: new_proposers(
                    &org.organization_address,
                    &org.left_org_info,
                    proposal_type,
                    &tx.transaction_id,
                ),
            });
        }
        writes.push(OrganizationWrite::Update(OrganizationUpdate {
            org_address: org.organization_address,
            org_hash: org.organization_hash,
            release_threshold,
            left_org_info: Value::Object(org.left_org_info),
            updated_at,
        }));
        Ok(writes)
    }

    /// Refreshes organizations touched by whitelist, member or threshold
    /// changes. All writes of the transaction commit together. Returns the
    /// number of events projected.
    pub async fn organization_updated_insert(
        &self,
        tx: &ScannedTransaction,
    ) -> anyhow::Result<usize> {
        let mut logs = deserialize_logs(&tx.logs, ORGANIZATION_WHITE_LIST_CHANGED)?;
        logs.extend(deserialize_logs(&tx.logs, ORGANIZATION_MEMBER_CHANGED)?);
        logs.extend(deserialize_logs(&tx.logs, ORGANIZATION_THRESHOLD_CHANGED)?);
        let updated_at = tx.timestamp()?;
        let lookups = logs
            .into_iter()
            .filter_map(|log| self.with_proposal_type(log))
            .map(|(proposal_type, log)| self.updated_writes(tx, proposal_type, log, updated_at));
        let writes = try_join_all(lookups).await?;
        let updated = writes.len();
        self.store
            .apply(writes.into_iter().flatten().collect())
            .await?;
        if updated > 0 {
            info!("{} organization updates in {}", updated, tx.transaction_id);
        }
        Ok(updated)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::chain::organization::{OrganizationInfo, SnapshotOrganizationReader};
    use crate::chain::transaction::encode_address;
    use crate::chain::transaction::tests::organization_log;
    use crate::chain::transaction::TransactionBody;
    use crate::db::persister::tests::TestPersister;
    use serde_json::json;

    pub const PARLIAMENT: &str = "parliament_contract";
    pub const ASSOCIATION: &str = "association_contract";
    pub const REFERENDUM: &str = "referendum_contract";

    pub fn contracts() -> ProposalContracts {
        ProposalContracts::new()
            .with_contract(PARLIAMENT, ProposalType::Parliament)
            .with_contract(ASSOCIATION, ProposalType::Association)
            .with_contract(REFERENDUM, ProposalType::Referendum)
    }

    pub fn org_address(seed: u8) -> String {
        encode_address(&[seed; 32])
    }

    pub fn organization(seed: u8, extra: Value) -> OrganizationInfo {
        let mut value = json!({
            "organizationAddress": org_address(seed),
            "organizationHash": format!("hash_{}", seed),
            "proposalReleaseThreshold": {
                "minimalApprovalThreshold": "100000000",
                "maximalRejectionThreshold": "50000000"
            }
        });
        if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    pub fn transaction(id: &str, logs: Vec<(&str, &str, u8)>) -> ScannedTransaction {
        ScannedTransaction {
            transaction_id: id.to_string(),
            transaction: TransactionBody {
                from: "creator".to_string(),
            },
            logs: logs
                .into_iter()
                .map(|(contract, name, seed)| organization_log(contract, name, &[seed; 32]))
                .collect(),
            time: "2020-08-01 12:30:00".to_string(),
        }
    }

    fn projector(orgs: Vec<OrganizationInfo>, store: Arc<TestPersister>) -> OrganizationProjector {
        OrganizationProjector::new(
            Arc::new(SnapshotOrganizationReader::new(orgs)),
            store,
            contracts(),
        )
    }

    #[tokio::test]
    async fn test_formatter_reshapes_organization() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let org = organization(1, json!({"proposerAuthorityRequired": false}));
        let projector = projector(vec![org], store);
        let tx = transaction("tx_1", vec![(PARLIAMENT, ORGANIZATION_CREATED, 1)]);
        let formatted = projector.organization_created_formatter(&tx).await?;
        assert_eq!(1, formatted.len());
        let item = &formatted[0];
        assert_eq!(org_address(1), item.org_address);
        assert_eq!("hash_1", item.org_hash);
        assert_eq!(ProposalType::Parliament, item.proposal_type);
        assert_eq!("creator", item.creator);
        assert_eq!("tx_1", item.tx_id);
        assert_eq!(
            Some(&json!(false)),
            item.left_org_info.get("proposerAuthorityRequired")
        );
        assert_eq!(tx.timestamp()?, item.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_parliament_created_without_proposers() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let projector = projector(vec![organization(1, json!({}))], store.clone());
        let tx = transaction("tx_1", vec![(PARLIAMENT, ORGANIZATION_CREATED, 1)]);
        assert_eq!(1, projector.organization_created_insert(&tx).await?);
        let tables = store.snapshot();
        let org = &tables.organizations[&org_address(1)];
        assert_eq!(
            json!({"minimalApprovalThreshold": "100000000", "maximalRejectionThreshold": "50000000"}),
            org.release_threshold
        );
        assert!(tables.proposers.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_referendum_created_with_rescaled_threshold() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new().with_token("ELF", 8));
        let org = organization(
            2,
            json!({"tokenSymbol": "ELF", "proposerWhiteList": {"proposers": ["alice", "bob", "alice"]}}),
        );
        let projector = projector(vec![org], store.clone());
        let tx = transaction("tx_2", vec![(REFERENDUM, ORGANIZATION_CREATED, 2)]);
        assert_eq!(1, projector.organization_created_insert(&tx).await?);
        let tables = store.snapshot();
        let org = &tables.organizations[&org_address(2)];
        assert_eq!(
            json!({"minimalApprovalThreshold": "1", "maximalRejectionThreshold": "0.5"}),
            org.release_threshold
        );
        assert_eq!(vec!["alice", "bob"], store.proposers_of(&org_address(2)));
        assert!(tables.proposers.iter().all(|p| p.related_tx_id == "tx_2"
            && p.proposal_type == ProposalType::Referendum));
        Ok(())
    }

    #[tokio::test]
    async fn test_created_insert_is_idempotent() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let org = organization(3, json!({"proposerWhiteList": {"proposers": ["carol"]}}));
        let projector = projector(vec![org], store.clone());
        let tx = transaction(
            "tx_3",
            vec![
                (ASSOCIATION, ORGANIZATION_CREATED, 3),
                (ASSOCIATION, ORGANIZATION_CREATED, 3),
            ],
        );
        assert_eq!(1, projector.organization_created_insert(&tx).await?);
        assert_eq!(0, projector.organization_created_insert(&tx).await?);
        assert_eq!(vec!["carol"], store.proposers_of(&org_address(3)));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_contract_is_skipped() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let projector = projector(vec![organization(4, json!({}))], store.clone());
        let tx = transaction("tx_4", vec![("other_contract", ORGANIZATION_CREATED, 4)]);
        assert_eq!(0, projector.organization_created_insert(&tx).await?);
        assert!(store.snapshot().organizations.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_referendum_without_token_fails_atomically() {
        let store = Arc::new(TestPersister::new());
        let orgs = vec![
            organization(5, json!({"proposerWhiteList": {"proposers": ["dave"]}})),
            organization(6, json!({"tokenSymbol": "NOPE"})),
        ];
        let projector = projector(orgs, store.clone());
        let tx = transaction(
            "tx_5",
            vec![
                (ASSOCIATION, ORGANIZATION_CREATED, 5),
                (REFERENDUM, ORGANIZATION_CREATED, 6),
            ],
        );
        assert!(projector.organization_created_insert(&tx).await.is_err());
        assert!(store.snapshot().organizations.is_empty());
    }

    #[tokio::test]
    async fn test_white_list_change_replaces_proposers() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let created = organization(7, json!({"proposerWhiteList": {"proposers": ["erin", "frank"]}}));
        projector(vec![created], store.clone())
            .organization_created_insert(&transaction(
                "tx_7",
                vec![(ASSOCIATION, ORGANIZATION_CREATED, 7)],
            ))
            .await?;

        let mut changed = organization(7, json!({"proposerWhiteList": {"proposers": ["grace"]}}));
        changed.organization_hash = "hash_7b".to_string();
        let projector = projector(vec![changed], store.clone());
        let mut tx = transaction("tx_8", vec![(ASSOCIATION, ORGANIZATION_WHITE_LIST_CHANGED, 7)]);
        tx.time = "2020-08-02 08:00:00".to_string();
        assert_eq!(1, projector.organization_updated_insert(&tx).await?);

        let tables = store.snapshot();
        let org = &tables.organizations[&org_address(7)];
        assert_eq!("hash_7b", org.org_hash);
        assert_eq!(tx.timestamp()?, org.updated_at);
        assert_eq!(vec!["grace"], store.proposers_of(&org_address(7)));
        assert!(tables.proposers.iter().all(|p| p.related_tx_id == "tx_8"));
        Ok(())
    }

    #[tokio::test]
    async fn test_white_list_change_of_unindexed_organization_is_skipped() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new());
        let changed = organization(8, json!({"proposerWhiteList": {"proposers": ["judy"]}}));
        let projector = projector(vec![changed], store.clone());
        let tx = transaction("tx_8", vec![(ASSOCIATION, ORGANIZATION_WHITE_LIST_CHANGED, 8)]);
        assert_eq!(1, projector.organization_updated_insert(&tx).await?);

        let tables = store.snapshot();
        assert!(tables.organizations.is_empty());
        assert!(tables.proposers.is_empty());
        assert_eq!(1, tables.commits);
        Ok(())
    }

    #[tokio::test]
    async fn test_threshold_change_keeps_proposers() -> anyhow::Result<()> {
        let store = Arc::new(TestPersister::new().with_token("ELF", 8));
        let created = organization(
            9,
            json!({"tokenSymbol": "ELF", "proposerWhiteList": {"proposers": ["heidi"]}}),
        );
        projector(vec![created], store.clone())
            .organization_created_insert(&transaction(
                "tx_9",
                vec![(REFERENDUM, ORGANIZATION_CREATED, 9)],
            ))
            .await?;

        let mut changed = organization(
            9,
            json!({"tokenSymbol": "ELF", "proposerWhiteList": {"proposers": ["ivan"]}}),
        );
        changed
            .proposal_release_threshold
            .insert("minimalApprovalThreshold".to_string(), json!("300000000"));
        let projector = projector(vec![changed], store.clone());
        let tx = transaction(
            "tx_10",
            vec![
                (REFERENDUM, ORGANIZATION_THRESHOLD_CHANGED, 9),
                (REFERENDUM, ORGANIZATION_MEMBER_CHANGED, 9),
            ],
        );
        assert_eq!(2, projector.organization_updated_insert(&tx).await?);

        let tables = store.snapshot();
        let org = &tables.organizations[&org_address(9)];
        assert_eq!(json!("3"), org.release_threshold["minimalApprovalThreshold"]);
        assert_eq!(vec!["heidi"], store.proposers_of(&org_address(9)));
        Ok(())
    }
}
