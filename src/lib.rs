//! Momentum calendar sync.
//!
//! Mirrors each user's task list into their external calendar. The
//! [`sync::SyncExecutor`] turns one user's tasks into idempotent event inserts
//! and the [`sync::FanOut`] scheduler discovers connected users and dispatches
//! their syncs without waiting on them.

pub mod api;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;
