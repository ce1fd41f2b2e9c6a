//! End-to-end registry behavior across the delete, modify, and rename hooks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use arbordir_session::{ClientConnection, SessionRegistry};
use arbordir_test_utils::{dn, RecordingConnection};
use arbordir_types::{DisconnectReason, Entry, ResultCode};

fn entry(s: &str) -> Entry {
    Entry::new(dn(s))
}

#[test]
fn test_registration_is_idempotent() {
    let registry = SessionRegistry::new();
    let conn = Arc::new(RecordingConnection::new(1));
    let handle = RecordingConnection::handle(&conn);
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");

    registry.register(&identity, &handle);
    registry.register(&identity, &handle);

    let bucket = registry.lookup(&identity).expect("bucket exists");
    assert_eq!(bucket.len(), 1, "same (DN, connection) pair registered once");
}

#[test]
fn test_deregister_drops_empty_bucket() {
    let registry = SessionRegistry::new();
    let conn = Arc::new(RecordingConnection::new(1));
    let handle = RecordingConnection::handle(&conn);
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");

    registry.register(&identity, &handle);
    registry.deregister(&identity, &handle);

    assert!(registry.lookup(&identity).is_none(), "empty bucket is removed");
    assert_eq!(registry.bucket_count(), 0);

    // Absent key and absent connection are both quiet no-ops.
    registry.deregister(&identity, &handle);
    registry.deregister(&dn("uid=ghost,dc=example,dc=com"), &handle);
}

#[test]
fn test_dual_role_registration_dedupes_equal_dns() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");
    let conn = Arc::new(
        RecordingConnection::new(1)
            .with_authentication(identity.clone())
            .with_authorization(identity.clone()),
    );
    let handle = RecordingConnection::handle(&conn);

    registry.register_connection(&handle);
    assert_eq!(registry.bucket_count(), 1);
    assert_eq!(registry.lookup(&identity).expect("bucket").len(), 1);

    registry.deregister_connection(&handle);
    assert_eq!(registry.bucket_count(), 0);
}

#[test]
fn test_dual_role_registration_with_proxied_authorization() {
    let registry = SessionRegistry::new();
    let authn = dn("uid=bob,ou=people,dc=example,dc=com");
    let authz = dn("uid=admin,ou=admins,dc=example,dc=com");
    let conn = Arc::new(
        RecordingConnection::new(1)
            .with_authentication(authn.clone())
            .with_authorization(authz.clone()),
    );
    let handle = RecordingConnection::handle(&conn);

    registry.register_connection(&handle);
    assert!(registry.lookup(&authn).is_some());
    assert!(registry.lookup(&authz).is_some());

    registry.deregister_connection(&handle);
    assert_eq!(registry.bucket_count(), 0);
}

#[test]
fn test_delete_cascade_disconnects_whole_subtree() {
    let registry = SessionRegistry::new();
    let suffix = dn("dc=example,dc=com");
    let user = dn("uid=bob,dc=example,dc=com");

    let suffix_conn = Arc::new(RecordingConnection::new(1).with_authentication(suffix.clone()));
    let user_conn = Arc::new(RecordingConnection::new(2).with_authentication(user.clone()));
    registry.register(&suffix, &RecordingConnection::handle(&suffix_conn));
    registry.register(&user, &RecordingConnection::handle(&user_conn));

    registry.on_entry_deleted(ResultCode::Success, &suffix);

    assert_eq!(registry.bucket_count(), 0, "registry left empty");
    for conn in [&suffix_conn, &user_conn] {
        let disconnects = conn.disconnects();
        assert_eq!(disconnects.len(), 1);
        assert_eq!(disconnects[0].0, DisconnectReason::IdentityRemoved);
    }
}

#[test]
fn test_delete_leaves_unrelated_identities_connected() {
    let registry = SessionRegistry::new();
    let doomed = dn("uid=bob,ou=people,dc=example,dc=com");
    let bystander = dn("uid=eve,ou=admins,dc=example,dc=com");

    let doomed_conn = Arc::new(RecordingConnection::new(1).with_authentication(doomed.clone()));
    let bystander_conn =
        Arc::new(RecordingConnection::new(2).with_authentication(bystander.clone()));
    registry.register(&doomed, &RecordingConnection::handle(&doomed_conn));
    registry.register(&bystander, &RecordingConnection::handle(&bystander_conn));

    registry.on_entry_deleted(ResultCode::Success, &doomed);

    assert_eq!(doomed_conn.disconnect_count(), 1);
    assert_eq!(bystander_conn.disconnect_count(), 0);
    assert!(registry.lookup(&bystander).is_some());
}

#[test]
fn test_delete_with_failed_result_mutates_nothing() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    registry.on_entry_deleted(ResultCode::Busy, &identity);
    registry.on_entry_deleted(ResultCode::NoSuchEntry, &identity);

    assert!(registry.lookup(&identity).is_some());
    assert_eq!(conn.disconnect_count(), 0);
}

#[test]
fn test_delete_notification_failure_does_not_block_siblings() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,dc=example,dc=com");

    let failing = Arc::new(
        RecordingConnection::new(1)
            .with_authentication(identity.clone())
            .with_failing_notifications(),
    );
    let healthy = Arc::new(RecordingConnection::new(2).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&failing));
    registry.register(&identity, &RecordingConnection::handle(&healthy));

    registry.on_entry_deleted(ResultCode::Success, &identity);

    assert_eq!(failing.disconnect_count(), 1);
    assert_eq!(healthy.disconnect_count(), 1, "failure of a sibling is isolated");
    assert_eq!(registry.bucket_count(), 0);
}

#[test]
fn test_delete_tolerates_connections_destroyed_behind_the_registry() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    // The connection layer destroys the connection without deregistering.
    drop(conn);

    registry.on_entry_deleted(ResultCode::Success, &identity);
    assert_eq!(registry.bucket_count(), 0);
}

#[test]
fn test_modify_pushes_exactly_one_update() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    let old = entry("uid=bob,ou=people,dc=example,dc=com");
    let new = Entry::builder()
        .dn(dn("uid=bob,ou=people,dc=example,dc=com"))
        .attributes(std::collections::BTreeMap::from([(
            "ds-privilege-name".to_string(),
            vec![],
        )]))
        .build();
    registry.on_entry_modified(ResultCode::Success, Some(&old), &new);

    let updates = conn.entry_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, old);
    assert_eq!(updates[0].1, new);

    assert_eq!(conn.disconnect_count(), 0, "modify never disconnects");
    assert!(registry.lookup(&identity).is_some(), "modify never re-keys");
}

#[test]
fn test_modify_without_prior_snapshot_is_noop() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    let new = entry("uid=bob,dc=example,dc=com");
    registry.on_entry_modified(ResultCode::Success, None, &new);
    registry.on_entry_modified(ResultCode::Unavailable, Some(&new), &new);

    assert!(conn.entry_updates().is_empty());
}

#[test]
fn test_modify_of_unregistered_entry_is_noop() {
    let registry = SessionRegistry::new();
    let old = entry("uid=ghost,dc=example,dc=com");
    let new = entry("uid=ghost,dc=example,dc=com");

    // Must not create a bucket as a side effect.
    registry.on_entry_modified(ResultCode::Success, Some(&old), &new);
    assert_eq!(registry.bucket_count(), 0);
}

#[test]
fn test_rename_rekeys_descendant_bucket_and_rewrites_dn() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    let old = entry("ou=people,dc=example,dc=com");
    let new = entry("ou=staff,dc=example,dc=com");
    registry.on_entry_renamed(ResultCode::Success, Some(&old), Some(&new));

    assert!(registry.lookup(&identity).is_none(), "old key is gone");
    let moved = dn("uid=bob,ou=staff,dc=example,dc=com");
    let bucket = registry.lookup(&moved).expect("bucket moved to new key");
    assert_eq!(bucket.len(), 1);
    assert_eq!(conn.authentication_dn(), Some(moved));
    assert_eq!(conn.disconnect_count(), 0, "rename never disconnects");
}

#[test]
fn test_rename_divergent_roles_rekey_independently() {
    let registry = SessionRegistry::new();
    let authn = dn("uid=bob,ou=people,dc=example,dc=com");
    let authz = dn("uid=admin,ou=people,dc=example,dc=com");
    let conn = Arc::new(
        RecordingConnection::new(1)
            .with_authentication(authn.clone())
            .with_authorization(authz.clone()),
    );
    let handle = RecordingConnection::handle(&conn);
    registry.register_connection(&handle);

    let old = entry("ou=people,dc=example,dc=com");
    let new = entry("ou=staff,dc=example,dc=com");
    registry.on_entry_renamed(ResultCode::Success, Some(&old), Some(&new));

    let new_authn = dn("uid=bob,ou=staff,dc=example,dc=com");
    let new_authz = dn("uid=admin,ou=staff,dc=example,dc=com");

    assert!(registry.lookup(&authn).is_none());
    assert!(registry.lookup(&authz).is_none());
    assert_eq!(registry.lookup(&new_authn).expect("authn bucket").len(), 1);
    assert_eq!(registry.lookup(&new_authz).expect("authz bucket").len(), 1);
    assert_eq!(conn.authentication_dn(), Some(new_authn));
    assert_eq!(conn.authorization_dn(), Some(new_authz));
}

#[test]
fn test_rename_mixed_role_bucket_moves_validated_members_only() {
    let registry = SessionRegistry::new();
    let inside = dn("uid=bob,ou=people,dc=example,dc=com");
    let outside = dn("uid=admin,ou=admins,dc=example,dc=com");

    let local = Arc::new(RecordingConnection::new(1).with_authentication(inside.clone()));
    // Authenticated outside the renamed subtree, authorized inside it; shares
    // the bucket at `inside` with `local`.
    let proxying = Arc::new(
        RecordingConnection::new(2)
            .with_authentication(outside.clone())
            .with_authorization(inside.clone()),
    );
    registry.register_connection(&RecordingConnection::handle(&local));
    registry.register_connection(&RecordingConnection::handle(&proxying));

    let old = entry("ou=people,dc=example,dc=com");
    let new = entry("ou=staff,dc=example,dc=com");
    registry.on_entry_renamed(ResultCode::Success, Some(&old), Some(&new));

    // The representative (`local`) yields an authentication transform, so the
    // locally authenticated member moves with the subtree.
    let moved = dn("uid=bob,ou=staff,dc=example,dc=com");
    let bucket = registry.lookup(&moved).expect("bucket at new key");
    assert_eq!(bucket.len(), 1);
    assert_eq!(local.authentication_dn(), Some(moved.clone()));

    // The proxying member fails the authentication-role check (its own
    // authentication DN is outside the old root), so that identity and its
    // bucket are untouched.
    assert_eq!(proxying.authentication_dn(), Some(outside.clone()));
    assert!(registry.lookup(&outside).is_some());

    // No authorization transform could be derived from this bucket's
    // representative, so the proxying member's authorization identity is
    // left unchanged rather than rewritten with a wrong DN.
    assert_eq!(proxying.authorization_dn(), Some(inside));
    assert!(!bucket.contains(&RecordingConnection::handle(&proxying)));
}

#[test]
fn test_rename_with_missing_snapshots_is_noop() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    let old = entry("ou=people,dc=example,dc=com");
    let new = entry("ou=staff,dc=example,dc=com");
    registry.on_entry_renamed(ResultCode::Success, None, Some(&new));
    registry.on_entry_renamed(ResultCode::Success, Some(&old), None);
    registry.on_entry_renamed(ResultCode::OperationsError, Some(&old), Some(&new));

    assert!(registry.lookup(&identity).is_some(), "no mutation occurred");
    assert_eq!(conn.authentication_dn(), Some(identity));
}

#[test]
fn test_rename_of_the_identity_entry_itself() {
    let registry = SessionRegistry::new();
    let identity = dn("uid=bob,ou=people,dc=example,dc=com");
    let conn = Arc::new(RecordingConnection::new(1).with_authentication(identity.clone()));
    registry.register(&identity, &RecordingConnection::handle(&conn));

    let old = entry("uid=bob,ou=people,dc=example,dc=com");
    let new = entry("uid=robert,ou=people,dc=example,dc=com");
    registry.on_entry_renamed(ResultCode::Success, Some(&old), Some(&new));

    let renamed = dn("uid=robert,ou=people,dc=example,dc=com");
    assert!(registry.lookup(&identity).is_none());
    assert_eq!(registry.lookup(&renamed).expect("bucket").len(), 1);
    assert_eq!(conn.authentication_dn(), Some(renamed));
}
