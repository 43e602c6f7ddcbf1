//! Orb bridge - client-side connection to the Orb system service.
//!
//! This crate connects a browser host process to the external Orb
//! service across an inter-process boundary and exposes the session
//! callback the remote service invokes back into the browser:
//!
//! - **Endpoint**: two-part identity used to locate the remote service
//! - **Binder**: pluggable "resolve and bind a named service" primitive
//! - **Connection**: lifecycle state machine and proxy ownership
//! - **Session**: the six-operation callback contract
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   connect / events    ┌──────────────────┐
//! │ Connection   │◄──────────────────────│  ServiceBinder   │
//! │ Manager      │                       │  (platform glue) │
//! └──────┬───────┘                       └──────────────────┘
//!        │ initialise(callback), execute_request
//! ┌──────▼───────────┐                   ┌──────────────────┐
//! │ RemoteSession    │──────────────────►│   Orb service    │
//! │ Proxy            │                   │ (remote process) │
//! └──────────────────┘                   └────────┬─────────┘
//!        ┌────────────────────────────────────────┘
//!        │ dispatchKeyEvent, loadApplication, ...
//! ┌──────▼───────┐
//! │ BrowserSession│  callback implemented by the embedding browser
//! └──────────────┘
//! ```
//!
//! On a successful bind the manager derives the proxy from the handle,
//! creates a fresh [`BrowserSession`] and registers it with the remote
//! side before anything else crosses the connection. From then until
//! disconnect, the service may invoke the callback concurrently and
//! unordered; only `dispatch_key_event` carries a result back, because
//! only it drives the caller's immediate control flow.

pub mod binder;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod loopback;
pub mod proxy;
pub mod session;

// Re-export key types at crate root
pub use binder::{BinderEvent, ConnectionHandle, ServiceBinder};
pub use connection::{ConnectionManager, ConnectionState};
pub use endpoint::{ORB_BRIDGE_SERVICE, ORB_PACKAGE, ResolvedService, ServiceEndpoint};
pub use error::{Error, Result};
pub use loopback::{LoopbackBinder, OrbServiceHost};
pub use proxy::{PortFuture, RemoteSessionProxy, SessionPort};
pub use session::{BrowserSession, SessionFactory, StubBrowserSession, dispatch_call};
