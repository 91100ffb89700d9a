//! # fixturedb REST API Module
//!
//! HTTP endpoints for schema management, entity CRUD/filtering, and the
//! consumption operations, plus the WebSocket change feed.

pub mod errors;
pub mod response;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use response::{
    DeleteResponse, ListResponse, ResetAllResponse, ResetResponse, SingleResponse,
};
pub use server::{build_router, ApiConfig, ApiServer};
