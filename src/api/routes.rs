use super::handlers::{get_contract_list, get_file, get_history, get_organization, get_organizations};
use super::ApiState;
use axum::{routing::get, Router};

pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/viewer/list", get(get_contract_list))
        .route("/api/viewer/getFile", get(get_file))
        .route("/api/viewer/history", get(get_history))
        .route("/api/proposal/organizations", get(get_organizations))
        .route("/api/proposal/organization", get(get_organization))
        .with_state(state)
}
