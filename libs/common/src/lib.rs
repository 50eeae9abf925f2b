//! Shared infrastructure for the CrushUV backend.
//!
//! This crate holds the pieces every service needs: environment-driven
//! configuration, PostgreSQL connection pooling, the Redis client used for
//! presence tracking, and the common error types.

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
