//! # Quire Shared
//!
//! Wire types shared between the API server and its clients.
//! Nothing here depends on the domain crate, so clients can use it as-is.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, PageMeta, PaginatedResponse};
