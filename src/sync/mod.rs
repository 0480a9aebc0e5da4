//! The synchronization engine.
//!
//! Per user: resolve credential → filter tasks → map to events → insert each
//! event independently. Across users: discover connected users and dispatch
//! one detached sync per user.

mod credentials;
mod dispatch;
mod executor;
mod fanout;
pub mod filter;
pub mod mapper;

pub use credentials::CredentialResolver;
pub use dispatch::{HttpDispatcher, SyncDispatcher, TaskDispatcher};
pub use executor::{SyncContext, SyncExecutor, SyncSettings};
pub use fanout::FanOut;
