use crate::config::IndexerConfig;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProposalType {
    Parliament,
    Association,
    Referendum,
}

impl ProposalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalType::Parliament => "Parliament",
            ProposalType::Association => "Association",
            ProposalType::Referendum => "Referendum",
        }
    }
}

impl fmt::Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProposalType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parliament" => Ok(ProposalType::Parliament),
            "association" => Ok(ProposalType::Association),
            "referendum" => Ok(ProposalType::Referendum),
            _ => Err(anyhow!("unknown proposal type {}", s)),
        }
    }
}

/// Maps governance contract addresses to the kind of organization they manage.
#[derive(Clone, Debug, Default)]
pub struct ProposalContracts {
    by_address: HashMap<String, ProposalType>,
}

impl ProposalContracts {
    pub fn new() -> Self {
        ProposalContracts::default()
    }

    pub fn with_contract(mut self, address: &str, proposal_type: ProposalType) -> Self {
        if !address.is_empty() {
            self.by_address.insert(address.to_string(), proposal_type);
        }
        self
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        ProposalContracts::new()
            .with_contract(&config.parliament_contract_address, ProposalType::Parliament)
            .with_contract(&config.association_contract_address, ProposalType::Association)
            .with_contract(&config.referendum_contract_address, ProposalType::Referendum)
    }

    pub fn proposal_type(&self, contract_address: &str) -> Option<ProposalType> {
        self.by_address.get(contract_address).copied()
    }
}

/// Result of a `GetOrganization` view call. Fields other than the address,
/// hash and release threshold are kept verbatim in `left_org_info`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    pub organization_address: String,
    #[serde(default)]
    pub organization_hash: String,
    #[serde(default)]
    pub proposal_release_threshold: Map<String, Value>,
    #[serde(flatten)]
    pub left_org_info: Map<String, Value>,
}

impl OrganizationInfo {
    pub fn token_symbol(&self) -> Option<&str> {
        token_symbol(&self.left_org_info)
    }

    pub fn proposers(&self) -> Vec<String> {
        whitelisted_proposers(&self.left_org_info)
    }
}

pub fn token_symbol(left_org_info: &Map<String, Value>) -> Option<&str> {
    left_org_info.get("tokenSymbol").and_then(Value::as_str)
}

/// Whitelisted proposers. Parliament organizations have no whitelist.
pub fn whitelisted_proposers(left_org_info: &Map<String, Value>) -> Vec<String> {
    left_org_info
        .get("proposerWhiteList")
        .and_then(|list| list.get("proposers"))
        .and_then(Value::as_array)
        .map(|proposers| {
            proposers
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads organizations from the chain.
#[async_trait]
pub trait OrganizationReader: Send + Sync {
    async fn get_organization(
        &self,
        proposal_type: ProposalType,
        organization_address: &str,
    ) -> anyhow::Result<OrganizationInfo>;
}

/// Serves organizations from a JSON snapshot keyed by organization address.
#[derive(Debug, Default)]
pub struct SnapshotOrganizationReader {
    organizations: HashMap<String, OrganizationInfo>,
}

impl SnapshotOrganizationReader {
    pub fn new(organizations: Vec<OrganizationInfo>) -> Self {
        let organizations = organizations
            .into_iter()
            .map(|org| (org.organization_address.clone(), org))
            .collect();
        SnapshotOrganizationReader { organizations }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let organizations: Vec<OrganizationInfo> =
            serde_json::from_str(json).context("parsing organization snapshot")?;
        Ok(Self::new(organizations))
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading organization snapshot {}", path))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }
}

#[async_trait]
impl OrganizationReader for SnapshotOrganizationReader {
    async fn get_organization(
        &self,
        proposal_type: ProposalType,
        organization_address: &str,
    ) -> anyhow::Result<OrganizationInfo> {
        match self.organizations.get(organization_address) {
            Some(org) => Ok(org.clone()),
            None => bail!(
                "{} organization {} not found in snapshot",
                proposal_type,
                organization_address
            ),
        }
    }
}
