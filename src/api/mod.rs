//! HTTP JSON endpoints read by the viewer and proposal pages.

pub mod error;
pub mod handlers;
pub mod routes;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<DatabaseConnection>,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

/// Envelope shared by every response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub msg: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            code: 0,
            msg: "success".to_string(),
            data,
        }
    }
}
