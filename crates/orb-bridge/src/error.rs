//! Error types for the Orb bridge.
//!
//! Every failure at the service boundary is contained here; none of them
//! propagate as panics into the browser's own logic.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur at the bridge boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint resolution produced no matching service. Surface for
    /// platform binder implementations whose resolution primitive can
    /// itself fail; the connection manager treats an empty candidate
    /// list as diagnostic and still attempts to bind.
    #[error("No service matched endpoint: {0}")]
    ResolutionFailed(String),

    /// The platform refused the bind request outright.
    #[error("Failed to bind Orb service: {0}")]
    BindFailed(String),

    /// `initialise` failed after a successful bind (stale handle,
    /// transport fault). The connection is bound but unusable.
    #[error("Callback registration failed: {0}")]
    RegistrationFailed(String),

    /// The connection is bound but callback registration failed; nothing
    /// may cross it until the next disconnect/connect cycle.
    #[error("Connection degraded: bound but callback registration failed")]
    Degraded,

    /// No active connection to the Orb service.
    #[error("Not connected to the Orb service")]
    Disconnected,

    /// A binding is already active or pending; disconnect first.
    #[error("Connection already active or pending")]
    AlreadyActive,

    /// Malformed or unexpected traffic on the session boundary.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A channel closed while a call was in flight.
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// Timeout waiting for an operation.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Wire envelope serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the error means the connection cannot carry calls
    /// right now (as opposed to a fault within one call).
    pub fn is_connection_unusable(&self) -> bool {
        matches!(self, Error::Degraded | Error::Disconnected)
    }
}
