//! # Repository Layer
//!
//! One repository per aggregate, each owning its SQL.
//!
//! ## Two calling conventions
//!
//! - Repository structs (`ItemRepository`, ...) hold a pool clone and
//!   serve standalone reads/writes.
//! - The mutations belonging to the checkout unit of work (stock
//!   reservation, snapshot upsert, transaction/line/link inserts) are
//!   free functions taking `&mut SqliteConnection`, so the orchestrator
//!   can run them all inside a single `sqlx::Transaction` and commit or
//!   roll back as one.

pub mod delivery;
pub mod discount;
pub mod item;
pub mod transaction;
