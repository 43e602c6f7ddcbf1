//! Platform binding abstraction.
//!
//! "Establish and observe a long-lived connection to a named remote
//! process" is a platform concern; the bridge only needs two primitives
//! from it (diagnostic resolution and an asynchronous bind request)
//! plus a stream of connect/disconnect events. Keeping this behind a
//! trait lets the same connection-manager logic run against the real
//! service manager or the in-process loopback host.

use crate::endpoint::{ResolvedService, ServiceEndpoint};
use crate::error::Result;
use crate::proxy::SessionPort;
use std::fmt;
use std::sync::Arc;

/// Asynchronous notification from the platform binder.
///
/// Delivered on the binder's own context, never on the thread that
/// requested the bind.
pub enum BinderEvent {
    /// A bind request completed; the handle represents the live binding.
    Connected(ConnectionHandle),
    /// The remote service terminated or unbound.
    Disconnected,
}

impl fmt::Debug for BinderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinderEvent::Connected(_) => f.write_str("Connected"),
            BinderEvent::Disconnected => f.write_str("Disconnected"),
        }
    }
}

/// Platform primitive for locating and binding a named remote service.
pub trait ServiceBinder: Send + Sync {
    /// Lists services matching `endpoint`. Diagnostic only: an empty
    /// result is logged by the caller but never gates a bind attempt.
    fn resolve(&self, endpoint: &ServiceEndpoint) -> Vec<ResolvedService>;

    /// Requests a binding to `endpoint`. Must not block; the outcome
    /// arrives later as [`BinderEvent`]s on the binder's event channel.
    fn bind(&self, endpoint: &ServiceEndpoint) -> Result<()>;
}

/// Opaque representation of an active binding.
///
/// Owned by the connection manager; absent while disconnected.
pub struct ConnectionHandle {
    port: Arc<dyn SessionPort>,
}

impl ConnectionHandle {
    pub fn new(port: Arc<dyn SessionPort>) -> Self {
        Self { port }
    }

    /// The transport-facing session interface of the bound service.
    pub fn session_port(&self) -> Arc<dyn SessionPort> {
        Arc::clone(&self.port)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConnectionHandle")
    }
}
