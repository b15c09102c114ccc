use super::error::ApiError;
use super::{ApiResponse, ApiState};
use crate::chain::organization::ProposalType;
use crate::db::entities::{contract_history, contracts, organizations};
use crate::db::queries::{self, Page};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn page_bounds(
    state: &ApiState,
    page_num: Option<u64>,
    page_size: Option<u64>,
) -> Result<(usize, usize), ApiError> {
    let page_num = page_num.unwrap_or(1);
    let page_size = page_size.unwrap_or(state.default_page_size);
    if page_num < 1 {
        return Err(ApiError::InvalidParameter("pageNum must be at least 1".to_string()));
    }
    if page_size < 1 || page_size > state.max_page_size {
        return Err(ApiError::InvalidParameter(format!(
            "pageSize must be between 1 and {}",
            state.max_page_size
        )));
    }
    let page_too_far =
        || ApiError::InvalidParameter(format!("pageNum {} is out of range", page_num));
    let page_num = usize::try_from(page_num).map_err(|_| page_too_far())?;
    let page_size = usize::try_from(page_size).map_err(|_| page_too_far())?;
    // the paginator computes the row offset as (page_num - 1) * page_size
    (page_num - 1)
        .checked_mul(page_size)
        .ok_or_else(page_too_far)?;
    Ok((page_num, page_size))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page_num: Option<u64>,
    pub page_size: Option<u64>,
    #[serde(default)]
    pub address: String,
}

pub async fn get_contract_list(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<contracts::Model>> {
    let (page_num, page_size) = page_bounds(&state, params.page_num, params.page_size)?;
    let page =
        queries::get_contract_list(state.db.as_ref(), &params.address, page_num, page_size).await?;
    Ok(Json(ApiResponse::success(page)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParams {
    pub address: Option<String>,
    pub code_hash: Option<String>,
}

/// Answers `{}` when the contract has no decompiled files yet.
pub async fn get_file(
    State(state): State<ApiState>,
    Query(params): Query<FileParams>,
) -> ApiResult<Value> {
    if params.address.is_none() && params.code_hash.is_none() {
        return Err(ApiError::InvalidParameter(
            "address or codeHash is required".to_string(),
        ));
    }
    let file = queries::get_files(
        state.db.as_ref(),
        params.address.as_deref(),
        params.code_hash.as_deref(),
    )
    .await?;
    let data = match file {
        Some(file) => serde_json::to_value(file)?,
        None => json!({}),
    };
    Ok(Json(ApiResponse::success(data)))
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub address: String,
}

pub async fn get_history(
    State(state): State<ApiState>,
    Query(params): Query<AddressParams>,
) -> ApiResult<Vec<contract_history::Model>> {
    let history = queries::get_history(state.db.as_ref(), &params.address).await?;
    Ok(Json(ApiResponse::success(history)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationListParams {
    pub proposal_type: Option<String>,
    #[serde(default)]
    pub search: String,
    pub page_num: Option<u64>,
    pub page_size: Option<u64>,
}

pub async fn get_organizations(
    State(state): State<ApiState>,
    Query(params): Query<OrganizationListParams>,
) -> ApiResult<Page<organizations::Model>> {
    let (page_num, page_size) = page_bounds(&state, params.page_num, params.page_size)?;
    let proposal_type = match params.proposal_type.as_deref() {
        Some(value) => Some(
            value
                .parse::<ProposalType>()
                .map_err(|e| ApiError::InvalidParameter(e.to_string()))?,
        ),
        None => None,
    };
    let page = queries::get_organization_list(
        state.db.as_ref(),
        proposal_type.as_ref().map(ProposalType::as_str),
        &params.search,
        page_num,
        page_size,
    )
    .await?;
    Ok(Json(ApiResponse::success(page)))
}

#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    #[serde(flatten)]
    pub organization: organizations::Model,
    pub proposers: Vec<String>,
}

pub async fn get_organization(
    State(state): State<ApiState>,
    Query(params): Query<AddressParams>,
) -> ApiResult<OrganizationDetail> {
    let (organization, proposers) = queries::get_organization(state.db.as_ref(), &params.address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("organization {}", params.address)))?;
    let detail = OrganizationDetail {
        organization,
        proposers: proposers.into_iter().map(|p| p.proposer).collect(),
    };
    Ok(Json(ApiResponse::success(detail)))
}
