//! # Quire Core
//!
//! The domain layer of the Quire blog backend.
//! Posts, comments and tags, the ports infrastructure must implement, and the
//! services that keep the publishing and comment-thread invariants.
//! This crate has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, DomainResult};
