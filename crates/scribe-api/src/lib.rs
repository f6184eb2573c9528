//! scribe-api - reference sync service for StackScribe clients
//!
//! Stores each caller's archives, tomes and entries in memory and exposes
//! them through `POST/GET /v1/sync` behind bearer-token authentication.

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod store;
