//! Identity session registry.
//!
//! One bucket per identity DN, holding every live connection currently
//! authenticated or authorized as that identity. A single connection may
//! appear under two keys (authentication and authorization DN), and a bucket
//! does not distinguish which role a member holds.
//!
//! Locking follows a two-phase pattern throughout: structural mutation of the
//! key-to-bucket map happens under the write lock, and fan-out to connections
//! (disconnect, snapshot push, DN rewrite) happens only after the lock is
//! released, against a member snapshot taken while it was held. Connections
//! take their own locks while being notified, so holding the registry lock
//! across fan-out would invite lock-ordering deadlock with the connection
//! layer.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use arbordir_types::{DisconnectReason, Dn, Entry, ResultCode};

use crate::connection::{ClientConnection, ConnectionSet};
use crate::dit_map::DitMap;
use crate::hooks::EntryEventHandler;

/// Registry of live sessions keyed by identity DN.
///
/// Owned by the server context; one instance per server, constructed and torn
/// down with it.
pub struct SessionRegistry {
    /// Identity DN to the set of connections holding that identity.
    /// Buckets are never stored empty.
    pub(crate) connections: RwLock<DitMap<ConnectionSet>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { connections: RwLock::new(DitMap::new()) }
    }

    /// Registers `connection` under `identity_dn`, creating the bucket if
    /// absent. Idempotent for a (DN, connection) pair already registered.
    pub fn register(&self, identity_dn: &Dn, connection: &Arc<dyn ClientConnection>) {
        let mut map = self.connections.write();
        if let Some(bucket) = map.get_mut(identity_dn) {
            bucket.insert(connection);
            return;
        }
        let mut bucket = ConnectionSet::new();
        bucket.insert(connection);
        map.put(identity_dn.clone(), bucket);
    }

    /// Removes `connection` from the bucket at `identity_dn`, dropping the
    /// bucket once it has no live members. No-op if the key or the connection
    /// is absent.
    pub fn deregister(&self, identity_dn: &Dn, connection: &Arc<dyn ClientConnection>) {
        let mut map = self.connections.write();
        let Some(bucket) = map.get_mut(identity_dn) else {
            return;
        };
        bucket.remove(connection);
        if bucket.is_empty() {
            map.remove(identity_dn);
        }
    }

    /// Registers `connection` under each identity role it currently holds:
    /// its authentication DN and, when distinct, its authorization DN.
    pub fn register_connection(&self, connection: &Arc<dyn ClientConnection>) {
        for dn in identity_dns(connection) {
            self.register(&dn, connection);
        }
    }

    /// Deregisters `connection` from each identity role it currently holds.
    /// No-op for unauthenticated connections.
    pub fn deregister_connection(&self, connection: &Arc<dyn ClientConnection>) {
        for dn in identity_dns(connection) {
            self.deregister(&dn, connection);
        }
    }

    /// Exact-key bucket lookup. Diagnostic and test accessor.
    pub fn lookup(&self, identity_dn: &Dn) -> Option<ConnectionSet> {
        self.connections.read().get(identity_dn).cloned()
    }

    /// Number of identity buckets currently held.
    pub fn bucket_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Handles a committed delete of `entry_dn`.
    ///
    /// Excises the whole subtree rooted at the deleted entry in one step,
    /// then disconnects every session found in a removed bucket: its backing
    /// identity no longer exists. A connection registered under two removed
    /// DNs is disconnected once per bucket; the second call is a harmless
    /// no-op at the connection layer.
    pub fn on_entry_deleted(&self, result: ResultCode, entry_dn: &Dn) {
        if !result.is_success() {
            return;
        }

        let removed = self.connections.write().remove_subtree(entry_dn);
        if removed.is_empty() {
            return;
        }
        debug!(entry = %entry_dn, buckets = removed.len(), "entry deleted, terminating affected sessions");

        for (bucket_dn, bucket) in removed {
            for connection in bucket.live() {
                let message = format!("identity entry '{bucket_dn}' has been deleted");
                if let Err(error) =
                    connection.disconnect(DisconnectReason::IdentityRemoved, Some(message))
                {
                    warn!(%error, "failed to terminate session for deleted identity");
                }
            }
        }
    }

    /// Handles a committed modify of an entry.
    ///
    /// Pushes the new snapshot to every connection in the exact bucket at the
    /// entry's DN so cached identity attributes can be refreshed. Keys do not
    /// change; nothing is disconnected.
    pub fn on_entry_modified(&self, result: ResultCode, old: Option<&Entry>, new: &Entry) {
        if !result.is_success() {
            return;
        }
        let Some(old) = old else {
            return;
        };

        let members = self
            .connections
            .read()
            .get(old.dn())
            .map(ConnectionSet::live)
            .unwrap_or_default();

        for connection in members {
            if let Err(error) = connection.update_authentication_entry(old, new) {
                warn!(%error, entry = %old.dn(), "failed to push modified identity entry");
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryEventHandler for SessionRegistry {
    fn on_entry_deleted(&self, result: ResultCode, entry_dn: &Dn) {
        SessionRegistry::on_entry_deleted(self, result, entry_dn);
    }

    fn on_entry_modified(&self, result: ResultCode, old: Option<&Entry>, new: &Entry) {
        SessionRegistry::on_entry_modified(self, result, old, new);
    }

    fn on_entry_renamed(&self, result: ResultCode, old: Option<&Entry>, new: Option<&Entry>) {
        SessionRegistry::on_entry_renamed(self, result, old, new);
    }
}

/// The distinct identity DNs a connection currently holds: authentication DN
/// first, then the authorization DN when it differs.
fn identity_dns(connection: &Arc<dyn ClientConnection>) -> Vec<Dn> {
    let mut dns = Vec::with_capacity(2);
    if let Some(authn) = connection.authentication_dn() {
        dns.push(authn);
    }
    if let Some(authz) = connection.authorization_dn() {
        if !dns.contains(&authz) {
            dns.push(authz);
        }
    }
    dns
}
