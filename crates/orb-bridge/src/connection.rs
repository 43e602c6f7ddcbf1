//! Connection lifecycle management for the Orb bridge.
//!
//! The [`ConnectionManager`] owns the binding to the remote service and
//! the proxy derived from it. State transitions are driven by the
//! binder's asynchronous notifications and happen concurrently with
//! handler invocations that read the connection state, so everything
//! shared sits behind one mutex that is never held across an await.

use crate::binder::{BinderEvent, ConnectionHandle, ServiceBinder};
use crate::endpoint::ServiceEndpoint;
use crate::error::{Error, Result};
use crate::proxy::RemoteSessionProxy;
use crate::session::SessionFactory;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Lifecycle state of the bridge connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been requested yet.
    Idle,
    /// A bind has been requested; the outcome is pending.
    Connecting,
    /// Bound, and the session callback is registered with the service.
    Connected,
    /// Bound, but callback registration failed. Unusable until the next
    /// disconnect/connect cycle; no automatic retry.
    Degraded,
    /// The binding is gone. A new explicit `connect` may follow.
    Disconnected,
}

struct Inner {
    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    proxy: Option<Arc<RemoteSessionProxy>>,
}

/// Owns the lifecycle of the connection to the Orb service.
///
/// `connect` requests a binding; the binder reports the outcome through
/// [`BinderEvent`]s which [`run`](ConnectionManager::run) feeds into
/// [`on_connected`](ConnectionManager::on_connected) /
/// [`on_disconnected`](ConnectionManager::on_disconnected). On every
/// successful bind a fresh browser session is created and registered
/// with the remote side before anything else crosses the connection.
pub struct ConnectionManager {
    endpoint: ServiceEndpoint,
    binder: Arc<dyn ServiceBinder>,
    factory: Arc<dyn SessionFactory>,
    inner: Mutex<Inner>,
    state_changed: Notify,
}

impl ConnectionManager {
    pub fn new(
        endpoint: ServiceEndpoint,
        binder: Arc<dyn ServiceBinder>,
        factory: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            endpoint,
            binder,
            factory,
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                handle: None,
                proxy: None,
            }),
            state_changed: Notify::new(),
        }
    }

    /// Current lifecycle state. This is the status a browser queries to
    /// learn that the bridge is degraded or disconnected.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// The endpoint this manager binds to.
    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// Requests a binding to the remote service. Does not block; the
    /// result arrives via the binder's event stream.
    ///
    /// Fails with [`Error::AlreadyActive`] while a binding is active or
    /// pending. Resolution returning zero candidates is logged and the
    /// bind is still attempted.
    pub fn connect(&self) -> Result<()> {
        // Guard and transition are one critical section: two racing
        // connect calls must never both reach bind.
        let prior = {
            let mut inner = self.inner.lock();
            match inner.state {
                ConnectionState::Idle | ConnectionState::Disconnected => {}
                state => {
                    tracing::warn!(?state, "connect refused while binding active or pending");
                    return Err(Error::AlreadyActive);
                }
            }
            let prior = inner.state;
            tracing::debug!(from = ?prior, to = ?ConnectionState::Connecting, "connection state transition");
            inner.state = ConnectionState::Connecting;
            prior
        };
        self.state_changed.notify_waiters();

        let candidates = self.binder.resolve(&self.endpoint);
        if candidates.is_empty() {
            tracing::warn!(endpoint = %self.endpoint, "no service matched endpoint; binding anyway");
        } else {
            tracing::debug!(endpoint = %self.endpoint, ?candidates, "resolved bridge service");
        }

        if let Err(e) = self.binder.bind(&self.endpoint) {
            tracing::error!(endpoint = %self.endpoint, error = %e, "bind request failed");
            self.set_state(prior);
            return Err(e);
        }
        Ok(())
    }

    /// Handles the binder's connected notification: derives the session
    /// proxy, issues a fresh browser session, and registers it with the
    /// remote side.
    ///
    /// Registration failure is contained: the state becomes
    /// [`ConnectionState::Degraded`] and no call will cross the broken
    /// proxy, but the process keeps running. No retry is attempted.
    pub async fn on_connected(&self, handle: ConnectionHandle) {
        {
            let inner = self.inner.lock();
            if matches!(
                inner.state,
                ConnectionState::Connected | ConnectionState::Degraded
            ) {
                tracing::warn!("connected notification while already bound; rebinding");
            }
        }
        tracing::debug!(endpoint = %self.endpoint, "bridge service connected");

        let proxy = Arc::new(RemoteSessionProxy::new(handle.session_port()));
        // The remote side does not retain callbacks across reconnects;
        // every bind gets a fresh session instance.
        let callback = self.factory.create_session();

        let state = match proxy.initialise(callback).await {
            Ok(()) => ConnectionState::Connected,
            Err(e) => {
                tracing::error!(error = %e, "session callback registration failed; connection unusable");
                ConnectionState::Degraded
            }
        };

        {
            let mut inner = self.inner.lock();
            inner.handle = Some(handle);
            inner.proxy = Some(proxy);
            inner.state = state;
        }
        self.state_changed.notify_waiters();
    }

    /// Handles the binder's disconnected notification: drops the handle
    /// and proxy. Idempotent under repeated notifications.
    pub fn on_disconnected(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Disconnected {
                return;
            }
            inner.handle = None;
            inner.proxy = None;
            inner.state = ConnectionState::Disconnected;
        }
        self.state_changed.notify_waiters();
        tracing::warn!(endpoint = %self.endpoint, "bridge service disconnected");
    }

    /// Returns the proxy for the remote session interface.
    ///
    /// Fails explicitly while no usable connection exists. A degraded
    /// or disconnected bridge must never be used as a silent no-op.
    pub fn session_proxy(&self) -> Result<Arc<RemoteSessionProxy>> {
        let inner = self.inner.lock();
        match inner.state {
            ConnectionState::Connected => inner.proxy.clone().ok_or(Error::Disconnected),
            ConnectionState::Degraded => Err(Error::Degraded),
            _ => Err(Error::Disconnected),
        }
    }

    /// Drives the manager from the binder's event stream until the
    /// stream ends.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<BinderEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                BinderEvent::Connected(handle) => self.on_connected(handle).await,
                BinderEvent::Disconnected => self.on_disconnected(),
            }
        }
        tracing::debug!("binder event stream ended");
    }

    /// Waits until the manager reaches `target`, with a timeout.
    pub async fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.state() == target {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(format!(
                    "waiting for connection state {target:?}"
                )));
            }

            tokio::select! {
                _ = self.state_changed.notified() => {}
                _ = tokio::time::sleep(remaining) => {}
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        {
            let mut inner = self.inner.lock();
            tracing::debug!(from = ?inner.state, to = ?state, "connection state transition");
            inner.state = state;
        }
        self.state_changed.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{LoopbackBinder, OrbServiceHost};
    use crate::session::{BrowserSession, StubBrowserSession};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stub_factory() -> Arc<dyn SessionFactory> {
        Arc::new(|| Arc::new(StubBrowserSession) as Arc<dyn BrowserSession>)
    }

    fn manager_with_host() -> (
        Arc<ConnectionManager>,
        Arc<OrbServiceHost>,
        Arc<LoopbackBinder>,
        mpsc::UnboundedReceiver<BinderEvent>,
    ) {
        let host = OrbServiceHost::new();
        let (binder, events) = LoopbackBinder::new(Arc::clone(&host));
        let binder = Arc::new(binder);
        let manager = Arc::new(ConnectionManager::new(
            ServiceEndpoint::orb_bridge(),
            Arc::clone(&binder) as Arc<dyn ServiceBinder>,
            stub_factory(),
        ));
        (manager, host, binder, events)
    }

    async fn next_handle(events: &mut mpsc::UnboundedReceiver<BinderEvent>) -> ConnectionHandle {
        match events.recv().await {
            Some(BinderEvent::Connected(handle)) => handle,
            other => panic!("expected connected event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn starts_idle_with_no_proxy() {
        let (manager, _host, _binder, _events) = manager_with_host();
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(matches!(
            manager.session_proxy(),
            Err(Error::Disconnected)
        ));
    }

    #[tokio::test]
    async fn connect_registers_callback_exactly_once() {
        let (manager, host, _binder, mut events) = manager_with_host();

        manager.connect().unwrap();
        assert_eq!(manager.state(), ConnectionState::Connecting);

        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(host.initialise_calls(), 1);
        assert!(host.has_callback());
        assert!(manager.session_proxy().is_ok());
    }

    #[tokio::test]
    async fn registration_failure_degrades_the_connection() {
        let (manager, host, _binder, mut events) = manager_with_host();
        host.fail_next_initialise();

        manager.connect().unwrap();
        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;

        assert_eq!(manager.state(), ConnectionState::Degraded);
        // The broken proxy is unreachable: nothing may cross it.
        let err = manager.session_proxy().unwrap_err();
        assert!(matches!(err, Error::Degraded));
        assert!(!host.has_callback());
        // Bound but unusable: the handle is retained until disconnect.
        assert!(manager.inner.lock().handle.is_some());
        assert!(manager.inner.lock().proxy.is_some());
    }

    #[tokio::test]
    async fn disconnect_clears_handle_and_proxy() {
        let (manager, _host, _binder, mut events) = manager_with_host();

        manager.connect().unwrap();
        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;

        manager.on_disconnected();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.inner.lock().handle.is_none());
        assert!(manager.inner.lock().proxy.is_none());
        assert!(matches!(
            manager.session_proxy(),
            Err(Error::Disconnected)
        ));
    }

    #[tokio::test]
    async fn repeated_disconnects_are_idempotent() {
        let (manager, _host, _binder, mut events) = manager_with_host();

        manager.connect().unwrap();
        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;

        manager.on_disconnected();
        manager.on_disconnected();
        manager.on_disconnected();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_issues_a_fresh_session() {
        let host = OrbServiceHost::new();
        let (binder, mut events) = LoopbackBinder::new(Arc::clone(&host));
        let sessions_created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sessions_created);
        let factory: Arc<dyn SessionFactory> = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(StubBrowserSession) as Arc<dyn BrowserSession>
        });
        let manager = Arc::new(ConnectionManager::new(
            ServiceEndpoint::orb_bridge(),
            Arc::new(binder) as Arc<dyn ServiceBinder>,
            factory,
        ));

        for cycle in 1..=2 {
            manager.connect().unwrap();
            let handle = next_handle(&mut events).await;
            manager.on_connected(handle).await;
            assert_eq!(manager.state(), ConnectionState::Connected);
            assert_eq!(sessions_created.load(Ordering::SeqCst), cycle);
            assert_eq!(host.initialise_calls(), cycle);

            manager.on_disconnected();
            assert!(manager.inner.lock().proxy.is_none());
        }
    }

    #[tokio::test]
    async fn connect_is_refused_while_active() {
        let (manager, _host, _binder, mut events) = manager_with_host();

        manager.connect().unwrap();
        assert!(matches!(manager.connect(), Err(Error::AlreadyActive)));

        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;
        assert!(matches!(manager.connect(), Err(Error::AlreadyActive)));
    }

    #[derive(Default)]
    struct CountingBinder {
        binds: AtomicUsize,
    }

    impl ServiceBinder for CountingBinder {
        fn resolve(&self, _endpoint: &ServiceEndpoint) -> Vec<crate::endpoint::ResolvedService> {
            Vec::new()
        }

        fn bind(&self, _endpoint: &ServiceEndpoint) -> crate::error::Result<()> {
            self.binds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn concurrent_connects_issue_a_single_bind() {
        let binder = Arc::new(CountingBinder::default());
        let manager = Arc::new(ConnectionManager::new(
            ServiceEndpoint::orb_bridge(),
            Arc::clone(&binder) as Arc<dyn ServiceBinder>,
            stub_factory(),
        ));

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let threads: Vec<_> = (0..2)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    manager.connect().is_ok()
                })
            })
            .collect();

        let successes = threads
            .into_iter()
            .map(|t| t.join().expect("connect thread panicked"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(binder.binds.load(Ordering::SeqCst), 1);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    struct RefusingBinder;

    impl ServiceBinder for RefusingBinder {
        fn resolve(&self, _endpoint: &ServiceEndpoint) -> Vec<crate::endpoint::ResolvedService> {
            Vec::new()
        }

        fn bind(&self, _endpoint: &ServiceEndpoint) -> crate::error::Result<()> {
            Err(Error::BindFailed("service manager unavailable".into()))
        }
    }

    #[test]
    fn failed_bind_rolls_back_to_the_prior_state() {
        let manager = ConnectionManager::new(
            ServiceEndpoint::orb_bridge(),
            Arc::new(RefusingBinder) as Arc<dyn ServiceBinder>,
            stub_factory(),
        );

        let err = manager.connect().unwrap_err();
        assert!(matches!(err, Error::BindFailed(_)));
        assert_eq!(manager.state(), ConnectionState::Idle);

        // The failed attempt does not wedge the manager.
        assert!(matches!(manager.connect(), Err(Error::BindFailed(_))));
    }

    #[tokio::test]
    async fn empty_resolution_does_not_gate_binding() {
        let (manager, _host, binder, mut events) = manager_with_host();
        binder.hide_from_resolution();

        manager.connect().unwrap();
        let handle = next_handle(&mut events).await;
        manager.on_connected(handle).await;
        assert_eq!(manager.state(), ConnectionState::Connected);
    }
}
