//! Error types for identity tracking using snafu.

use snafu::Snafu;

use crate::dn::Dn;

/// Errors from DN rename transforms.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum RenameError {
    /// No transform exists because the DN does not lie under the renamed
    /// subtree root.
    #[snafu(display("'{dn}' is not a descendant of '{root}'"))]
    NotDescendant {
        /// The DN for which a transform was requested.
        dn: Dn,
        /// The old subtree root of the rename.
        root: Dn,
    },
}

/// Errors raised by connection notification callbacks.
///
/// Notification failures are isolated per connection: the registry logs them
/// and continues with the remaining members of a bucket.
#[derive(Debug, Snafu)]
pub enum NotifyError {
    /// The connection rejected or failed to apply a pushed notification.
    #[snafu(display("connection {connection_id} could not be notified: {reason}"))]
    Rejected {
        /// Identifier of the connection that failed.
        connection_id: u64,
        /// Connection-supplied failure detail.
        reason: String,
    },
}
