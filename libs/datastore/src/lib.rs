//! Storage layer for the CrushUV matchmaking and chat core.
//!
//! Everything the services know about persistence sits behind the traits in
//! [`store`]: member profiles, the append-only swipe ledger, matches, and
//! per-match messages. Two providers implement them: [`postgres::PgStore`]
//! for production and [`memory::MemoryStore`] as an in-memory fixture for
//! tests and demos. The provider is picked once at startup.
//!
//! Both providers publish a topic to the in-process [`hub::ChangeHub`] after
//! every committed write, so live subscriptions can re-run their query and
//! push a fresh result set to consumers.

pub mod error;
pub mod hub;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use hub::ChangeHub;
pub use store::{MatchOrder, Stores};
