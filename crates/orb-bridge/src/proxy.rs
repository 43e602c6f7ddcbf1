//! Local proxy for the Orb service's session-management interface.

use crate::error::Result;
use crate::session::BrowserSession;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future alias for [`SessionPort`] methods.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Transport-facing half of the bridge session interface.
///
/// A [`ServiceBinder`](crate::binder::ServiceBinder) implementation hands
/// one of these out with each connection handle. Keeping it a trait keeps
/// the connection manager testable against a fake transport; a platform
/// implementation marshals these calls across the real process boundary.
pub trait SessionPort: Send + Sync {
    /// Registers the browser's callback with the remote service.
    fn initialise(&self, callback: Arc<dyn BrowserSession>) -> PortFuture<'_, ()>;

    /// Submits an opaque request payload and awaits the opaque response.
    fn execute_request(&self, request: Vec<u8>) -> PortFuture<'_, Vec<u8>>;
}

/// Local proxy representing the remote session interface.
///
/// Valid only while its connection is bound: the connection manager
/// derives one per successful bind and drops it on disconnect, so a
/// stale proxy never survives a connection cycle.
pub struct RemoteSessionProxy {
    port: Arc<dyn SessionPort>,
}

impl RemoteSessionProxy {
    pub(crate) fn new(port: Arc<dyn SessionPort>) -> Self {
        Self { port }
    }

    /// Registers `callback` with the remote service.
    ///
    /// Called exactly once per connection, immediately after bind
    /// succeeds and before anything else crosses the connection.
    pub async fn initialise(&self, callback: Arc<dyn BrowserSession>) -> Result<()> {
        self.port.initialise(callback).await
    }

    /// Sends an opaque request to the remote service and awaits its
    /// opaque response.
    pub async fn execute_request(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        self.port.execute_request(request).await
    }
}

impl fmt::Debug for RemoteSessionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RemoteSessionProxy")
    }
}
