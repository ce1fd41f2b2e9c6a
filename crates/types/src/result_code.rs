//! Operation result and disconnect reason catalogs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result code of a committed directory operation.
///
/// Values follow the standard LDAP result code assignments. The registry's
/// lifecycle hooks act only on [`ResultCode::Success`]; any other code means
/// the triggering operation did not take effect and the hooks are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ResultCode {
    /// The operation completed successfully.
    Success = 0,
    /// Internal server error while processing the operation.
    OperationsError = 1,
    /// The request violated the protocol.
    ProtocolError = 2,
    /// The targeted entry does not exist.
    NoSuchEntry = 32,
    /// The supplied credentials were invalid.
    InvalidCredentials = 49,
    /// The server is too busy to process the operation.
    Busy = 51,
    /// The server is shutting down or otherwise unavailable.
    Unavailable = 52,
    /// Any other failure.
    Other = 80,
}

impl ResultCode {
    /// Whether this code indicates a successful commit.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, ResultCode::Success)
    }

    /// Returns the numeric wire value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric value to a `ResultCode`, returning `None` for
    /// unknown values.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ResultCode::Success),
            1 => Some(ResultCode::OperationsError),
            2 => Some(ResultCode::ProtocolError),
            32 => Some(ResultCode::NoSuchEntry),
            49 => Some(ResultCode::InvalidCredentials),
            51 => Some(ResultCode::Busy),
            52 => Some(ResultCode::Unavailable),
            80 => Some(ResultCode::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u16())
    }
}

/// Reason a connection is being forcibly closed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// The entry backing the connection's identity no longer exists.
    IdentityRemoved,
    /// The server is shutting down.
    ServerShutdown,
    /// An administrator terminated the connection.
    AdminTerminate,
    /// The connection exceeded its idle time limit.
    IdleTimeExceeded,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisconnectReason::IdentityRemoved => "the authenticated identity has been removed",
            DisconnectReason::ServerShutdown => "the server is shutting down",
            DisconnectReason::AdminTerminate => "terminated by an administrator",
            DisconnectReason::IdleTimeExceeded => "the idle time limit was exceeded",
        };
        f.write_str(text)
    }
}
