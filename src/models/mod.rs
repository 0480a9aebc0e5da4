//! Domain models for Momentum calendar sync.
//!
//! # Stored Documents
//!
//! - [`CredentialRecord`]: a user's credential document. Holds at most one
//!   delegated-access [`Credential`] under the `googleCalendar` key.
//! - [`TaskListRecord`]: a user's ordered task list.
//!
//! # Derived Views
//!
//! - [`EligibleTask`]: a [`Task`] with both ends of its time window set and
//!   not yet completed. Never stored.
//! - [`EventDescriptor`]: the calendar event a task maps to.
//!
//! # Outcomes
//!
//! - [`SyncReport`]: per-user result of one sync run, discarded afterwards.
//! - [`TriggerSummary`]: result of one fan-out pass.

mod credential;
mod event;
mod report;
mod task;

pub use credential::*;
pub use event::*;
pub use report::*;
pub use task::*;
