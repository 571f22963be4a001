//! # API Shared
//!
//! Shared definitions for the Guardian APIs.
//!
//! Contains:
//! - Wire types (`dto` module): health-form payloads, chat messages, request/response bodies
//! - Shared services like `HealthService`
//!
//! Used by `guardian-core` (as its input/output vocabulary) and `api-rest`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
