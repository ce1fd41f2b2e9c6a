//! Server context owning the session registry and the connection table.
//!
//! One context per server process, constructed at startup and torn down by
//! [`ServerContext::shutdown`]. The registry is an explicit member handed out
//! by reference; nothing here is process-global.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use arbordir_session::{ClientConnection, EntryEventHandler, SessionRegistry};
use arbordir_types::{DisconnectReason, Entry};

use crate::config::Config;
use crate::connection::{AuthenticationInfo, Connection};

/// Owner of the per-server session registry and live-connection table.
pub struct ServerContext {
    config: Config,
    registry: Arc<SessionRegistry>,
    connections: Mutex<HashMap<u64, Arc<Connection>>>,
    next_connection_id: AtomicU64,
}

impl ServerContext {
    /// Creates a context with an empty registry and connection table.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            connections: Mutex::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session registry owned by this context.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The handler to wire into post-commit operation dispatch.
    pub fn event_handler(&self) -> Arc<dyn EntryEventHandler> {
        self.registry.clone()
    }

    /// Records a newly accepted client connection.
    pub fn open_connection(&self, peer_addr: SocketAddr) -> Arc<Connection> {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let connection =
            Arc::new(Connection::new(id, peer_addr, self.config.limits.clone()));
        self.connections.lock().insert(id, Arc::clone(&connection));
        info!(connection = id, peer = %peer_addr, "accepted client connection");
        connection
    }

    /// Installs the identity established by a successful bind, replacing any
    /// previous one: the old identity roles are deregistered, the new
    /// authentication info is installed, and the new roles are registered.
    pub fn authenticate(
        &self,
        connection: &Arc<Connection>,
        authentication_entry: Entry,
        authorization_entry: Option<Entry>,
    ) {
        let handle: Arc<dyn ClientConnection> = connection.clone();
        self.registry.deregister_connection(&handle);
        connection.set_authentication_info(AuthenticationInfo::authenticated(
            authentication_entry,
            authorization_entry,
        ));
        self.registry.register_connection(&handle);
    }

    /// Tears down a connection: deregisters each identity role it holds and
    /// drops it from the table.
    pub fn close_connection(&self, connection: &Arc<Connection>) {
        let handle: Arc<dyn ClientConnection> = connection.clone();
        self.registry.deregister_connection(&handle);
        self.connections.lock().remove(&connection.id());
    }

    /// Number of connections currently tracked.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Disconnects every tracked connection and empties the registry.
    pub fn shutdown(&self) {
        let connections: Vec<Arc<Connection>> =
            self.connections.lock().drain().map(|(_, connection)| connection).collect();

        for connection in connections {
            let handle: Arc<dyn ClientConnection> = connection.clone();
            self.registry.deregister_connection(&handle);
            if let Err(error) = handle.disconnect(DisconnectReason::ServerShutdown, None) {
                warn!(%error, "failed to disconnect client during shutdown");
            }
        }
        info!("server context shut down");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use arbordir_types::{Dn, ResultCode};

    fn context() -> ServerContext {
        ServerContext::new(Config::for_test(3890))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:51234".parse().unwrap()
    }

    fn dn(s: &str) -> Dn {
        s.parse().unwrap()
    }

    #[test]
    fn test_bind_registers_and_close_deregisters() {
        let ctx = context();
        let conn = ctx.open_connection(peer());
        assert_eq!(ctx.connection_count(), 1);

        let identity = dn("uid=bob,ou=people,dc=example,dc=com");
        ctx.authenticate(&conn, Entry::new(identity.clone()), None);
        assert_eq!(ctx.registry().lookup(&identity).expect("bucket").len(), 1);

        ctx.close_connection(&conn);
        assert_eq!(ctx.connection_count(), 0);
        assert!(ctx.registry().lookup(&identity).is_none());
    }

    #[test]
    fn test_rebind_swaps_identity_roles() {
        let ctx = context();
        let conn = ctx.open_connection(peer());

        let first = dn("uid=bob,ou=people,dc=example,dc=com");
        let second = dn("uid=eve,ou=people,dc=example,dc=com");
        ctx.authenticate(&conn, Entry::new(first.clone()), None);
        ctx.authenticate(&conn, Entry::new(second.clone()), None);

        assert!(ctx.registry().lookup(&first).is_none(), "old identity deregistered");
        assert!(ctx.registry().lookup(&second).is_some());
    }

    #[test]
    fn test_deleted_identity_disconnects_bound_connection() {
        let ctx = context();
        let conn = ctx.open_connection(peer());
        let identity = dn("uid=bob,ou=people,dc=example,dc=com");
        ctx.authenticate(&conn, Entry::new(identity.clone()), None);

        ctx.event_handler().on_entry_deleted(ResultCode::Success, &dn("ou=people,dc=example,dc=com"));

        assert!(!conn.is_connected());
        assert_eq!(conn.disconnect_reason(), Some(DisconnectReason::IdentityRemoved));
        assert_eq!(ctx.registry().bucket_count(), 0);
    }

    #[test]
    fn test_renamed_identity_follows_connection() {
        let ctx = context();
        let conn = ctx.open_connection(peer());
        let identity = dn("uid=bob,ou=people,dc=example,dc=com");
        ctx.authenticate(&conn, Entry::new(identity.clone()), None);

        let old = Entry::new(dn("ou=people,dc=example,dc=com"));
        let new = Entry::new(dn("ou=staff,dc=example,dc=com"));
        ctx.event_handler().on_entry_renamed(ResultCode::Success, Some(&old), Some(&new));

        let moved = dn("uid=bob,ou=staff,dc=example,dc=com");
        assert!(conn.is_connected(), "rename never disconnects");
        assert_eq!(conn.authentication_dn(), Some(moved.clone()));
        assert!(ctx.registry().lookup(&moved).is_some());
    }

    #[test]
    fn test_shutdown_disconnects_everything() {
        let ctx = context();
        let bound = ctx.open_connection(peer());
        let anonymous = ctx.open_connection(peer());
        ctx.authenticate(&bound, Entry::new(dn("uid=bob,dc=example,dc=com")), None);

        ctx.shutdown();

        assert_eq!(ctx.connection_count(), 0);
        assert_eq!(ctx.registry().bucket_count(), 0);
        assert_eq!(bound.disconnect_reason(), Some(DisconnectReason::ServerShutdown));
        assert_eq!(anonymous.disconnect_reason(), Some(DisconnectReason::ServerShutdown));
    }
}
