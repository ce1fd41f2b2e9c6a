//! A recording [`ClientConnection`] double.

use std::sync::Arc;

use parking_lot::Mutex;

use arbordir_session::ClientConnection;
use arbordir_types::{DisconnectReason, Dn, Entry, NotifyError};

/// Test connection that records every notification pushed by the registry.
///
/// Construct with the builder-style `with_*` methods, wrap in an [`Arc`], and
/// coerce via [`RecordingConnection::handle`] when registering:
///
/// ```
/// use std::sync::Arc;
/// use arbordir_session::ClientConnection;
/// use arbordir_test_utils::{dn, RecordingConnection};
///
/// let conn = Arc::new(RecordingConnection::new(1).with_authentication(dn("uid=bob,dc=com")));
/// let handle = RecordingConnection::handle(&conn);
/// assert_eq!(handle.connection_id(), 1);
/// ```
///
/// [`ClientConnection`]: arbordir_session::ClientConnection
pub struct RecordingConnection {
    id: u64,
    fail_notifications: bool,
    authentication_dn: Mutex<Option<Dn>>,
    authorization_dn: Mutex<Option<Dn>>,
    disconnects: Mutex<Vec<(DisconnectReason, Option<String>)>>,
    entry_updates: Mutex<Vec<(Entry, Entry)>>,
}

impl RecordingConnection {
    /// Creates an unauthenticated connection.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            fail_notifications: false,
            authentication_dn: Mutex::new(None),
            authorization_dn: Mutex::new(None),
            disconnects: Mutex::new(Vec::new()),
            entry_updates: Mutex::new(Vec::new()),
        }
    }

    /// Sets the authentication DN.
    #[must_use]
    pub fn with_authentication(self, dn: Dn) -> Self {
        *self.authentication_dn.lock() = Some(dn);
        self
    }

    /// Sets the authorization DN.
    #[must_use]
    pub fn with_authorization(self, dn: Dn) -> Self {
        *self.authorization_dn.lock() = Some(dn);
        self
    }

    /// Makes every disconnect and entry-update notification fail, for
    /// exercising per-connection failure isolation.
    #[must_use]
    pub fn with_failing_notifications(mut self) -> Self {
        self.fail_notifications = true;
        self
    }

    /// Coerces a shared connection into the trait-object handle the registry
    /// expects.
    pub fn handle(this: &Arc<Self>) -> Arc<dyn ClientConnection> {
        this.clone()
    }

    /// Disconnect notifications received, in order.
    pub fn disconnects(&self) -> Vec<(DisconnectReason, Option<String>)> {
        self.disconnects.lock().clone()
    }

    /// Entry-update notifications received, in order.
    pub fn entry_updates(&self) -> Vec<(Entry, Entry)> {
        self.entry_updates.lock().clone()
    }

    /// Number of disconnect notifications received (attempted deliveries,
    /// whether or not this double was configured to fail them).
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.lock().len()
    }
}

impl ClientConnection for RecordingConnection {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn authentication_dn(&self) -> Option<Dn> {
        self.authentication_dn.lock().clone()
    }

    fn authorization_dn(&self) -> Option<Dn> {
        self.authorization_dn.lock().clone()
    }

    fn set_authentication_dn(&self, dn: Dn) {
        *self.authentication_dn.lock() = Some(dn);
    }

    fn set_authorization_dn(&self, dn: Dn) {
        *self.authorization_dn.lock() = Some(dn);
    }

    fn disconnect(
        &self,
        reason: DisconnectReason,
        message: Option<String>,
    ) -> Result<(), NotifyError> {
        self.disconnects.lock().push((reason, message));
        if self.fail_notifications {
            return Err(NotifyError::Rejected {
                connection_id: self.id,
                reason: "configured to fail".to_string(),
            });
        }
        Ok(())
    }

    fn update_authentication_entry(&self, old: &Entry, new: &Entry) -> Result<(), NotifyError> {
        self.entry_updates.lock().push((old.clone(), new.clone()));
        if self.fail_notifications {
            return Err(NotifyError::Rejected {
                connection_id: self.id,
                reason: "configured to fail".to_string(),
            });
        }
        Ok(())
    }
}
