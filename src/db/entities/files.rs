use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Decompiled source tree of one contract version.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i64,
    pub address: String,
    pub code_hash: String,
    pub contract_name: String,
    pub version: String,
    /// JSON encoded file tree, parsed by the viewer.
    #[sea_orm(column_type = "Text")]
    pub files: String,
    pub update_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
