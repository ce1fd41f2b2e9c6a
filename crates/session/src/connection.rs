//! Connection handles and bucket membership.

use std::sync::{Arc, Weak};

use arbordir_types::{DisconnectReason, Dn, Entry, NotifyError};

/// A live client connection, as seen by the session registry.
///
/// Implemented by the connection-management subsystem, which owns connection
/// lifetime; the registry only holds non-owning references for notification.
///
/// The DN accessors expose the connection's cached authentication identity
/// (the DN it proved credentials for) and authorization identity (the DN it
/// acts as, which differs under proxied authorization). Both are rewritten in
/// place when an ancestor entry is renamed.
pub trait ClientConnection: Send + Sync {
    /// Server-assigned connection identifier, unique for the process lifetime.
    fn connection_id(&self) -> u64;

    /// The DN this connection authenticated as, if any.
    fn authentication_dn(&self) -> Option<Dn>;

    /// The DN this connection is authorized to act as, if any.
    fn authorization_dn(&self) -> Option<Dn>;

    /// Rewrites the cached authentication DN after a rename.
    fn set_authentication_dn(&self, dn: Dn);

    /// Rewrites the cached authorization DN after a rename.
    fn set_authorization_dn(&self, dn: Dn);

    /// Forcibly terminates the connection. Must be idempotent: disconnecting
    /// an already-disconnected connection is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the termination could not be delivered; the
    /// registry logs the failure and continues with other connections.
    fn disconnect(
        &self,
        reason: DisconnectReason,
        message: Option<String>,
    ) -> Result<(), NotifyError>;

    /// Pushes a fresh snapshot of the entry backing this connection's
    /// identity so cached attributes (privileges, password-policy state) can
    /// be refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the update could not be applied; the
    /// registry logs the failure and continues with other connections.
    fn update_authentication_entry(&self, old: &Entry, new: &Entry) -> Result<(), NotifyError>;
}

/// The set of live connections registered under one identity DN.
///
/// Membership is by allocation identity and non-owning: the set holds weak
/// handles and never keeps a connection alive. Notification passes iterate a
/// [`ConnectionSet::live`] snapshot taken under the registry lock, so the set
/// tolerates the map being mutated again once the snapshot exists.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSet {
    members: Vec<Weak<dyn ClientConnection>>,
}

impl ConnectionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. Idempotent: re-adding a member leaves the set
    /// unchanged. Returns whether the set grew.
    pub(crate) fn insert(&mut self, connection: &Arc<dyn ClientConnection>) -> bool {
        self.prune();
        let handle = Arc::downgrade(connection);
        if self.members.iter().any(|member| member.ptr_eq(&handle)) {
            return false;
        }
        self.members.push(handle);
        true
    }

    /// Removes a connection. Returns whether it was a member.
    pub(crate) fn remove(&mut self, connection: &Arc<dyn ClientConnection>) -> bool {
        let handle = Arc::downgrade(connection);
        let before = self.members.len();
        self.members.retain(|member| !member.ptr_eq(&handle));
        let removed = self.members.len() != before;
        self.prune();
        removed
    }

    /// Unions `other` into this set, keeping membership unique.
    pub(crate) fn merge(&mut self, other: ConnectionSet) {
        for handle in other.members {
            if handle.strong_count() > 0
                && !self.members.iter().any(|member| member.ptr_eq(&handle))
            {
                self.members.push(handle);
            }
        }
    }

    /// Snapshot of the members that are still alive, as strong handles for
    /// notification fan-out.
    pub fn live(&self) -> Vec<Arc<dyn ClientConnection>> {
        self.members.iter().filter_map(Weak::upgrade).collect()
    }

    /// Whether `connection` is a member.
    pub fn contains(&self, connection: &Arc<dyn ClientConnection>) -> bool {
        let handle = Arc::downgrade(connection);
        self.members.iter().any(|member| member.ptr_eq(&handle))
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.members.iter().filter(|member| member.strong_count() > 0).count()
    }

    /// Whether the set has no live members.
    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|member| member.strong_count() == 0)
    }

    /// Drops handles whose connection has been destroyed.
    fn prune(&mut self) {
        self.members.retain(|member| member.strong_count() > 0);
    }
}
