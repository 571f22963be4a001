//! Repository management modules.
//!
//! File-backed storage for health forms and user accounts.

pub mod accounts;
pub mod forms;
pub(crate) mod shared;
