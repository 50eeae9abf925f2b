//! Match and conversation service
//!
//! HTTP surface, authentication middleware, and the domain services for
//! swiping, matching, chat, profiles, and presence.

pub mod error;
pub mod middleware;
pub mod models;
pub mod presence;
pub mod routes;
pub mod services;
pub mod state;
pub mod subscription;
