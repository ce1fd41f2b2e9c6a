//! Rename (modify-DN) cascade.
//!
//! A rename re-keys exactly one entry, but every registered identity under
//! that entry's former position moves with it, because descendant DNs share
//! the renamed suffix. The cascade excises the whole old subtree, rebuilds
//! each bucket under its post-rename keys, and rewrites the affected
//! connections' cached identity DNs. The authentication role and the
//! authorization role transform independently, since a proxying connection
//! may hold one identity inside the renamed subtree and one outside it.

use std::sync::Arc;

use tracing::{debug, warn};

use arbordir_types::{Dn, Entry, ResultCode};

use crate::connection::{ClientConnection, ConnectionSet};
use crate::dit_map::DitMap;
use crate::registry::SessionRegistry;

/// DN rewrites owed to one connection, applied after the structural phase
/// releases the registry lock.
struct PendingDnUpdate {
    connection: Arc<dyn ClientConnection>,
    authentication_dn: Option<Dn>,
    authorization_dn: Option<Dn>,
}

impl SessionRegistry {
    /// Handles a committed rename of an entry.
    ///
    /// Under the write lock: excises the subtree rooted at the old DN, and
    /// for each removed bucket derives the post-rename authentication and
    /// authorization keys from one representative member, re-admitting each
    /// connection into a role's new bucket only after verifying that its own
    /// DN for that role actually lay under the old root. Rebuilt buckets are
    /// reinserted (merging with any bucket already at the new key) before the
    /// lock is released, so readers never observe a half-moved subtree.
    ///
    /// After release, the qualifying connections' cached DNs are rewritten.
    /// Per-connection transform anomalies are logged and skipped; one broken
    /// member never aborts the cascade for its siblings.
    pub fn on_entry_renamed(&self, result: ResultCode, old: Option<&Entry>, new: Option<&Entry>) {
        if !result.is_success() {
            return;
        }
        let (Some(old), Some(new)) = (old, new) else {
            return;
        };
        let old_root = old.dn();
        let new_root = new.dn();

        let mut pending: Vec<PendingDnUpdate> = Vec::new();
        {
            let mut map = self.connections.write();
            let removed = map.remove_subtree(old_root);
            if removed.is_empty() {
                return;
            }
            debug!(old = %old_root, new = %new_root, buckets = removed.len(), "entry renamed, re-keying sessions");

            for (bucket_dn, bucket) in removed {
                rebuild_bucket(&mut map, &bucket_dn, &bucket, old_root, new_root, &mut pending);
            }
        }

        for update in pending {
            if let Some(dn) = update.authentication_dn {
                update.connection.set_authentication_dn(dn);
            }
            if let Some(dn) = update.authorization_dn {
                update.connection.set_authorization_dn(dn);
            }
        }
    }
}

/// Re-admits one removed bucket's members under their post-rename keys.
fn rebuild_bucket(
    map: &mut DitMap<ConnectionSet>,
    bucket_dn: &Dn,
    bucket: &ConnectionSet,
    old_root: &Dn,
    new_root: &Dn,
    pending: &mut Vec<PendingDnUpdate>,
) {
    let members = bucket.live();
    let Some(representative) = members.first() else {
        debug!(bucket = %bucket_dn, "dropping bucket with no live sessions during rename");
        return;
    };

    // One transform per role, derived from the representative. A
    // representative identity outside the renamed subtree is expected for
    // mixed-role buckets and simply yields no key for that role.
    let new_authn_key =
        transform_role_dn(representative.authentication_dn(), old_root, new_root, bucket_dn);
    let new_authz_key =
        transform_role_dn(representative.authorization_dn(), old_root, new_root, bucket_dn);

    let mut authn_bucket = ConnectionSet::new();
    let mut authz_bucket = ConnectionSet::new();

    for connection in &members {
        let mut update = PendingDnUpdate {
            connection: Arc::clone(connection),
            authentication_dn: None,
            authorization_dn: None,
        };

        // Re-validate per connection rather than trusting the representative
        // for the whole bucket.
        if connection
            .authentication_dn()
            .is_some_and(|dn| dn.is_descendant_of(old_root))
        {
            match &new_authn_key {
                Some(dn) => {
                    authn_bucket.insert(connection);
                    update.authentication_dn = Some(dn.clone());
                }
                None => warn!(
                    connection = connection.connection_id(),
                    bucket = %bucket_dn,
                    "authentication identity lies under the renamed subtree but no transform was derived; leaving it unchanged"
                ),
            }
        }
        if connection
            .authorization_dn()
            .is_some_and(|dn| dn.is_descendant_of(old_root))
        {
            match &new_authz_key {
                Some(dn) => {
                    authz_bucket.insert(connection);
                    update.authorization_dn = Some(dn.clone());
                }
                None => warn!(
                    connection = connection.connection_id(),
                    bucket = %bucket_dn,
                    "authorization identity lies under the renamed subtree but no transform was derived; leaving it unchanged"
                ),
            }
        }

        if update.authentication_dn.is_some() || update.authorization_dn.is_some() {
            pending.push(update);
        }
    }

    if let Some(dn) = new_authn_key {
        insert_or_merge(map, dn, authn_bucket);
    }
    if let Some(dn) = new_authz_key {
        insert_or_merge(map, dn, authz_bucket);
    }
}

/// Renames one role's identity DN, or returns `None` when the identity is
/// absent or does not lie under the old root.
fn transform_role_dn(dn: Option<Dn>, old_root: &Dn, new_root: &Dn, bucket_dn: &Dn) -> Option<Dn> {
    let dn = dn?;
    match dn.rename(old_root, new_root) {
        Ok(renamed) => Some(renamed),
        Err(error) => {
            debug!(%error, bucket = %bucket_dn, "representative identity is outside the renamed subtree");
            None
        }
    }
}

/// Inserts a rebuilt bucket at its new key, unioning with any bucket already
/// present there (the authentication and authorization buckets of one old
/// bucket can land on the same key). Empty buckets are skipped.
fn insert_or_merge(map: &mut DitMap<ConnectionSet>, dn: Dn, bucket: ConnectionSet) {
    if bucket.is_empty() {
        return;
    }
    if let Some(existing) = map.get_mut(&dn) {
        existing.merge(bucket);
        return;
    }
    map.put(dn, bucket);
}
