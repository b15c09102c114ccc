use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_serializing)]
    pub id: i64,
    #[sea_orm(unique)]
    pub org_address: String,
    pub org_hash: String,
    pub proposal_type: String,
    pub release_threshold: Json,
    pub left_org_info: Json,
    pub creator: String,
    pub tx_id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::proposers::Entity")]
    Proposers,
}

impl Related<super::proposers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proposers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
