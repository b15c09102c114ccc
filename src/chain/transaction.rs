use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDateTime};
use prost::Message;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const ORGANIZATION_CREATED: &str = "OrganizationCreated";
pub const ORGANIZATION_WHITE_LIST_CHANGED: &str = "OrganizationWhiteListChanged";
pub const ORGANIZATION_MEMBER_CHANGED: &str = "OrganizationMemberChanged";
pub const ORGANIZATION_THRESHOLD_CHANGED: &str = "OrganizationThresholdChanged";

/// A transaction as delivered by the chain scanner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScannedTransaction {
    #[serde(rename = "TransactionId")]
    pub transaction_id: String,
    #[serde(rename = "Transaction")]
    pub transaction: TransactionBody,
    #[serde(rename = "Logs", default)]
    pub logs: Vec<TransactionLog>,
    pub time: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionBody {
    #[serde(rename = "From")]
    pub from: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionLog {
    /// Address of the contract that fired the event.
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Indexed", default)]
    pub indexed: Vec<String>,
    #[serde(rename = "NonIndexed", default)]
    pub non_indexed: Option<String>,
}

impl ScannedTransaction {
    pub fn log_names(&self) -> impl Iterator<Item = &str> {
        self.logs.iter().map(|log| log.name.as_str())
    }

    /// Block time of the transaction. The scanner emits either RFC 3339 or
    /// MySQL style timestamps.
    pub fn timestamp(&self) -> anyhow::Result<NaiveDateTime> {
        if let Ok(time) = DateTime::parse_from_rfc3339(&self.time) {
            return Ok(time.naive_utc());
        }
        NaiveDateTime::parse_from_str(&self.time, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("unrecognised transaction time {}", self.time))
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AddressMessage {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

/// Every organization event carries the organization address as field 1.
/// The remaining fields are skipped while decoding.
#[derive(Clone, PartialEq, Message)]
pub struct OrganizationEvent {
    #[prost(message, optional, tag = "1")]
    pub organization_address: Option<AddressMessage>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeserializedLog {
    pub name: String,
    pub contract_address: String,
    pub organization_address: String,
}

/// Renders raw address bytes as base58 with a 4 byte double sha256 checksum.
pub fn encode_address(bytes: &[u8]) -> String {
    let checksum = Sha256::digest(&Sha256::digest(bytes));
    let mut payload = bytes.to_vec();
    payload.extend_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

fn decode_organization_event(log: &TransactionLog) -> anyhow::Result<OrganizationEvent> {
    let mut event = OrganizationEvent::default();
    for fragment in log.indexed.iter().chain(log.non_indexed.iter()) {
        let bytes = base64::decode(fragment)
            .with_context(|| format!("invalid base64 in {} log", log.name))?;
        event
            .merge(bytes.as_slice())
            .with_context(|| format!("invalid protobuf in {} log", log.name))?;
    }
    Ok(event)
}

/// Decodes every log named `name` into the emitting contract and the
/// organization address the event refers to.
pub fn deserialize_logs(
    logs: &[TransactionLog],
    name: &str,
) -> anyhow::Result<Vec<DeserializedLog>> {
    logs.iter()
        .filter(|log| log.name == name)
        .map(|log| {
            let event = decode_organization_event(log)?;
            let address = event
                .organization_address
                .ok_or_else(|| anyhow!("{} log without organization address", log.name))?;
            Ok(DeserializedLog {
                name: log.name.clone(),
                contract_address: log.address.clone(),
                organization_address: encode_address(&address.value),
            })
        })
        .collect()
}
