//! Server-owned client connections.
//!
//! [`Connection`] is the concrete connection type the network layer creates
//! for each accepted client. The session registry sees it only through the
//! [`ClientConnection`] trait and holds weak references; the
//! [`ServerContext`](crate::context::ServerContext) connection table is the
//! owner.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use arbordir_session::ClientConnection;
use arbordir_types::{DisconnectReason, Dn, Entry, NotifyError};

use crate::config::LimitsConfig;

/// Cached identity state of one connection.
///
/// Holds the entry snapshots the connection authenticated against plus the
/// DNs derived from them. The DNs are tracked separately from the snapshots
/// because a rename of an ancestor entry rewrites the DNs in place while the
/// snapshots keep their original content.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationInfo {
    authentication_entry: Option<Entry>,
    authorization_entry: Option<Entry>,
    authentication_dn: Option<Dn>,
    authorization_dn: Option<Dn>,
}

impl AuthenticationInfo {
    /// State of an unauthenticated (anonymous) connection.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// State after a successful bind as `authentication_entry`, optionally
    /// with a different authorization identity established by proxied
    /// authorization.
    pub fn authenticated(authentication_entry: Entry, authorization_entry: Option<Entry>) -> Self {
        let authentication_dn = Some(authentication_entry.dn().clone());
        let authorization_dn = authorization_entry.as_ref().map(|e| e.dn().clone());
        Self {
            authentication_entry: Some(authentication_entry),
            authorization_entry,
            authentication_dn,
            authorization_dn,
        }
    }

    /// The DN the connection authenticated as.
    pub fn authentication_dn(&self) -> Option<&Dn> {
        self.authentication_dn.as_ref()
    }

    /// The DN the connection is authorized to act as.
    pub fn authorization_dn(&self) -> Option<&Dn> {
        self.authorization_dn.as_ref()
    }

    /// Cached snapshot of the authentication entry.
    pub fn authentication_entry(&self) -> Option<&Entry> {
        self.authentication_entry.as_ref()
    }

    /// Cached snapshot of the authorization entry.
    pub fn authorization_entry(&self) -> Option<&Entry> {
        self.authorization_entry.as_ref()
    }

    /// Replaces whichever cached snapshots carry `old`'s DN with `new`.
    fn refresh_entry(&mut self, old: &Entry, new: &Entry) {
        if self.authentication_entry.as_ref().is_some_and(|e| e.dn() == old.dn()) {
            self.authentication_entry = Some(new.clone());
        }
        if self.authorization_entry.as_ref().is_some_and(|e| e.dn() == old.dn()) {
            self.authorization_entry = Some(new.clone());
        }
    }
}

/// Connection liveness state.
#[derive(Debug, Clone)]
enum ConnectionState {
    Connected,
    Disconnected { reason: DisconnectReason },
}

/// A client connection accepted by the server.
pub struct Connection {
    id: u64,
    peer_addr: SocketAddr,
    connect_time: DateTime<Utc>,
    limits: LimitsConfig,
    auth: RwLock<AuthenticationInfo>,
    state: Mutex<ConnectionState>,
}

impl Connection {
    /// Creates a connection record for an accepted client.
    pub fn new(id: u64, peer_addr: SocketAddr, limits: LimitsConfig) -> Self {
        Self {
            id,
            peer_addr,
            connect_time: Utc::now(),
            limits,
            auth: RwLock::new(AuthenticationInfo::anonymous()),
            state: Mutex::new(ConnectionState::Connected),
        }
    }

    /// Server-assigned connection identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the connection was established.
    pub fn connect_time(&self) -> DateTime<Utc> {
        self.connect_time
    }

    /// Resource limits snapshotted at accept time.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Current identity state.
    pub fn authentication_info(&self) -> AuthenticationInfo {
        self.auth.read().clone()
    }

    /// Installs new identity state, as done on a successful bind.
    pub fn set_authentication_info(&self, info: AuthenticationInfo) {
        *self.auth.write() = info;
    }

    /// Whether the connection has not been disconnected.
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Connected)
    }

    /// The reason this connection was disconnected, if it was.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        match *self.state.lock() {
            ConnectionState::Connected => None,
            ConnectionState::Disconnected { reason } => Some(reason),
        }
    }
}

impl ClientConnection for Connection {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn authentication_dn(&self) -> Option<Dn> {
        self.auth.read().authentication_dn.clone()
    }

    fn authorization_dn(&self) -> Option<Dn> {
        self.auth.read().authorization_dn.clone()
    }

    fn set_authentication_dn(&self, dn: Dn) {
        self.auth.write().authentication_dn = Some(dn);
    }

    fn set_authorization_dn(&self, dn: Dn) {
        self.auth.write().authorization_dn = Some(dn);
    }

    fn disconnect(
        &self,
        reason: DisconnectReason,
        message: Option<String>,
    ) -> Result<(), NotifyError> {
        let mut state = self.state.lock();
        if let ConnectionState::Disconnected { .. } = *state {
            return Ok(());
        }
        *state = ConnectionState::Disconnected { reason };
        drop(state);

        info!(
            connection = self.id,
            peer = %self.peer_addr,
            %reason,
            message = message.as_deref().unwrap_or(""),
            "terminating client connection"
        );
        Ok(())
    }

    fn update_authentication_entry(&self, old: &Entry, new: &Entry) -> Result<(), NotifyError> {
        self.auth.write().refresh_entry(old, new);
        debug!(connection = self.id, entry = %new.dn(), "refreshed cached identity entry");
        Ok(())
    }
}
