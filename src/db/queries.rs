use super::entities::{contract_history, contracts, files, organizations, proposers};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct Page<T> {
    pub total: usize,
    pub list: Vec<T>,
}

/// Contracts whose address contains `address`, most recently updated first.
/// `page_num` starts at 1.
pub async fn get_contract_list<C>(
    db: &C,
    address: &str,
    page_num: usize,
    page_size: usize,
) -> Result<Page<contracts::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let paginator = contracts::Entity::find()
        .filter(contracts::Column::Address.contains(address))
        .order_by_desc(contracts::Column::UpdateTime)
        .order_by_desc(contracts::Column::Id)
        .paginate(db, page_size);
    let total = paginator.num_items().await?;
    let list = paginator.fetch_page(page_num.saturating_sub(1)).await?;
    Ok(Page { total, list })
}

/// Source files of one contract version when `code_hash` is given,
/// otherwise of the latest version at `address`.
pub async fn get_files<C>(
    db: &C,
    address: Option<&str>,
    code_hash: Option<&str>,
) -> Result<Option<files::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = files::Entity::find();
    if let Some(code_hash) = code_hash {
        query = query.filter(files::Column::CodeHash.eq(code_hash));
    }
    if let Some(address) = address {
        query = query.filter(files::Column::Address.eq(address));
    }
    query
        .order_by_desc(files::Column::UpdateTime)
        .order_by_desc(files::Column::Id)
        .one(db)
        .await
}

pub async fn get_history<C>(db: &C, address: &str) -> Result<Vec<contract_history::Model>, DbErr>
where
    C: ConnectionTrait,
{
    contract_history::Entity::find()
        .filter(contract_history::Column::Address.eq(address))
        .order_by_desc(contract_history::Column::UpdateTime)
        .order_by_desc(contract_history::Column::Id)
        .all(db)
        .await
}

pub async fn get_organization_list<C>(
    db: &C,
    proposal_type: Option<&str>,
    search: &str,
    page_num: usize,
    page_size: usize,
) -> Result<Page<organizations::Model>, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = organizations::Entity::find();
    if let Some(proposal_type) = proposal_type {
        query = query.filter(organizations::Column::ProposalType.eq(proposal_type));
    }
    if !search.is_empty() {
        query = query.filter(organizations::Column::OrgAddress.contains(search));
    }
    let paginator = query
        .order_by_desc(organizations::Column::UpdatedAt)
        .order_by_desc(organizations::Column::Id)
        .paginate(db, page_size);
    let total = paginator.num_items().await?;
    let list = paginator.fetch_page(page_num.saturating_sub(1)).await?;
    Ok(Page { total, list })
}

pub async fn get_organization<C>(
    db: &C,
    org_address: &str,
) -> Result<Option<(organizations::Model, Vec<proposers::Model>)>, DbErr>
where
    C: ConnectionTrait,
{
    let organization = organizations::Entity::find()
        .filter(organizations::Column::OrgAddress.eq(org_address))
        .one(db)
        .await?;
    match organization {
        Some(organization) => {
            let proposers = proposers::Entity::find()
                .filter(proposers::Column::OrgAddress.eq(org_address))
                .order_by_asc(proposers::Column::Id)
                .all(db)
                .await?;
            Ok(Some((organization, proposers)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::collections::BTreeMap;

    fn history(id: i64, event: &str) -> contract_history::Model {
        contract_history::Model {
            id,
            address: "contract_a".to_string(),
            author: "author".to_string(),
            code_hash: format!("hash_{}", id),
            tx_id: format!("tx_{}", id),
            version: "1.0.0".to_string(),
            block_height: 100 + id,
            event: event.to_string(),
            update_time: NaiveDateTime::from_timestamp(1_600_000_000 + id, 0),
        }
    }

    fn num_items(total: i32) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", total.into())])
    }

    fn logged_sql(db: DatabaseConnection) -> String {
        format!("{:?}", db.into_transaction_log())
    }

    fn contract(id: i64) -> contracts::Model {
        contracts::Model {
            id,
            address: format!("contract_{}", id),
            author: "author".to_string(),
            category: "0".to_string(),
            is_system_contract: false,
            serial: id.to_string(),
            contract_name: "Token".to_string(),
            version: "1.0.0".to_string(),
            update_time: NaiveDateTime::from_timestamp(1_600_000_000 + id, 0),
        }
    }

    #[tokio::test]
    async fn test_get_contract_list() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![vec![num_items(5)]])
            .append_query_results(vec![vec![contract(4), contract(3)]])
            .into_connection();
        let page = get_contract_list(&db, "ract", 2, 2).await?;
        assert_eq!(5, page.total);
        assert_eq!(vec![contract(4), contract(3)], page.list);

        let sql = logged_sql(db);
        assert!(sql.contains("`contracts`.`address` LIKE"));
        assert!(sql.contains("%ract%"));
        assert!(sql.contains("ORDER BY `contracts`.`update_time` DESC, `contracts`.`id` DESC"));
        assert!(sql.contains("LIMIT"));
        assert!(sql.contains("OFFSET"));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_organization_list_filters() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![vec![num_items(0)]])
            .append_query_results(vec![Vec::<organizations::Model>::new()])
            .into_connection();
        let page = get_organization_list(&db, Some("Referendum"), "2Rq", 1, 10).await?;
        assert_eq!(0, page.total);
        assert!(page.list.is_empty());

        let sql = logged_sql(db);
        assert!(sql.contains("`organizations`.`proposal_type` ="));
        assert!(sql.contains("Referendum"));
        assert!(sql.contains("`organizations`.`org_address` LIKE"));
        assert!(sql.contains("%2Rq%"));
        assert!(sql.contains(
            "ORDER BY `organizations`.`updated_at` DESC, `organizations`.`id` DESC"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_history() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![vec![
                history(2, "CodeUpdated"),
                history(1, "ContractDeployed"),
            ]])
            .into_connection();
        let events = get_history(&db, "contract_a").await?;
        assert_eq!(2, events.len());
        assert_eq!("CodeUpdated", events[0].event);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_files_missing() -> anyhow::Result<()> {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results(vec![Vec::<files::Model>::new()])
            .into_connection();
        assert!(get_files(&db, Some("contract_a"), None).await?.is_none());
        Ok(())
    }
}
