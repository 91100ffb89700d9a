//! # Response Formatting
//!
//! Standard response envelopes for the REST API.

use serde::Serialize;

/// List response
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }
}

/// Single record response
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Delete acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn ok() -> Self {
        Self { deleted: true }
    }
}

/// Reset acknowledgement for a single record
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

impl ResetResponse {
    pub fn ok() -> Self {
        Self { reset: true }
    }
}

/// Bulk reset result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetAllResponse {
    pub reset_count: usize,
}
