//! Observability module - request IDs on top of the tracing logger.

mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdMiddleware};
