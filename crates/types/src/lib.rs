//! Core type definitions for the ArborDir directory server.
//!
//! These types are shared between the session registry and the server:
//!
//! - Hierarchical distinguished names ([`Dn`]) with descendant tests and
//!   rename transforms
//! - Entry snapshots exchanged with the operation pipeline ([`Entry`])
//! - Operation result and disconnect reason catalogs

#![deny(unsafe_code)]

mod dn;
mod entry;
mod error;
mod result_code;

pub use dn::Dn;
pub use entry::Entry;
pub use error::{NotifyError, RenameError};
pub use result_code::{DisconnectReason, ResultCode};
