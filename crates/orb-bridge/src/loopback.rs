//! In-process binder and service host.
//!
//! [`OrbServiceHost`] stands in for the remote Orb service: it accepts
//! the session callback at `initialise` time and can then drive the
//! callback operations the way the real service would from its own
//! process. Calls cross a byte-serialized boundary: each invocation is
//! encoded as a wire `SessionCall`, sent over a channel, decoded on the
//! browser side, and answered through a oneshot. The payload opacity
//! and concurrency of the real boundary are preserved.
//!
//! [`LoopbackBinder`] exposes the host through the [`ServiceBinder`]
//! trait, which keeps the connection manager testable without a
//! platform service manager.

use crate::binder::{BinderEvent, ConnectionHandle, ServiceBinder};
use crate::endpoint::{ResolvedService, ServiceEndpoint};
use crate::error::{Error, Result};
use crate::proxy::{PortFuture, SessionPort};
use crate::session::{BrowserSession, dispatch_call};
use orb_protocol::{SessionCall, SessionReply};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

struct InboundCall {
    payload: Vec<u8>,
    reply_tx: oneshot::Sender<Vec<u8>>,
}

/// Stand-in for the remote Orb service process.
pub struct OrbServiceHost {
    callback_tx: Mutex<Option<mpsc::UnboundedSender<InboundCall>>>,
    initialise_calls: AtomicUsize,
    fail_initialise: AtomicBool,
    requests: Mutex<Vec<Vec<u8>>>,
}

impl OrbServiceHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            callback_tx: Mutex::new(None),
            initialise_calls: AtomicUsize::new(0),
            fail_initialise: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Makes the next `initialise` call fail, simulating a stale handle
    /// or a transport fault during registration.
    pub fn fail_next_initialise(&self) {
        self.fail_initialise.store(true, Ordering::SeqCst);
    }

    /// Number of times a callback has been registered with this host.
    pub fn initialise_calls(&self) -> usize {
        self.initialise_calls.load(Ordering::SeqCst)
    }

    /// Whether a session callback is currently registered.
    pub fn has_callback(&self) -> bool {
        self.callback_tx.lock().is_some()
    }

    /// Opaque request payloads received via `execute_request`.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().clone()
    }

    /// Drops the registered callback, as the service would when its
    /// process goes away.
    pub fn drop_callback(&self) {
        *self.callback_tx.lock() = None;
    }

    fn register_callback(&self, callback: Arc<dyn BrowserSession>) -> Result<()> {
        self.initialise_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialise.swap(false, Ordering::SeqCst) {
            return Err(Error::RegistrationFailed(
                "initialise refused by service host".into(),
            ));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<InboundCall>();
        tokio::spawn(async move {
            while let Some(call) = rx.recv().await {
                let session = Arc::clone(&callback);
                // Invocations are unordered with respect to each other.
                tokio::spawn(async move {
                    match serde_json::from_slice::<SessionCall>(&call.payload) {
                        Ok(decoded) => {
                            let reply = dispatch_call(session.as_ref(), decoded);
                            if let Ok(bytes) = serde_json::to_vec(&reply) {
                                let _ = call.reply_tx.send(bytes);
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "undecodable session call dropped");
                        }
                    }
                });
            }
        });

        *self.callback_tx.lock() = Some(tx);
        Ok(())
    }

    fn handle_execute_request(&self, request: Vec<u8>) -> Result<Vec<u8>> {
        tracing::debug!(len = request.len(), "execute_request received");
        self.requests.lock().push(request);
        Ok(b"{}".to_vec())
    }

    async fn invoke(&self, call: SessionCall) -> Result<SessionReply> {
        let payload = serde_json::to_vec(&call)?;
        let tx = self
            .callback_tx
            .lock()
            .clone()
            .ok_or_else(|| Error::Protocol("no browser session registered".into()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(InboundCall { payload, reply_tx })
            .map_err(|_| Error::ChannelClosed)?;
        let bytes = reply_rx.await.map_err(|_| Error::ChannelClosed)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Dispatches a key event into the browser and awaits the
    /// consumption result, as the real service does before deciding on
    /// fallback key handling.
    pub async fn dispatch_key_event(&self, action: i32, key_code: i32, tv_code: i32) -> Result<bool> {
        match self
            .invoke(SessionCall::DispatchKeyEvent {
                action,
                key_code,
                tv_code,
            })
            .await?
        {
            SessionReply::Consumed(consumed) => Ok(consumed),
            other => Err(Error::Protocol(format!(
                "unexpected reply to key dispatch: {other:?}"
            ))),
        }
    }

    pub async fn load_application(
        &self,
        app_id: i32,
        url: &[u8],
        graphic_ids: &[i32],
    ) -> Result<()> {
        self.invoke(SessionCall::LoadApplication {
            app_id,
            url: url.to_vec(),
            graphic_ids: graphic_ids.to_vec(),
        })
        .await?;
        Ok(())
    }

    pub async fn show_application(&self) -> Result<()> {
        self.invoke(SessionCall::ShowApplication).await?;
        Ok(())
    }

    pub async fn hide_application(&self) -> Result<()> {
        self.invoke(SessionCall::HideApplication).await?;
        Ok(())
    }

    pub async fn dispatch_event(&self, event_type: &[u8], properties: &[u8]) -> Result<()> {
        self.invoke(SessionCall::DispatchEvent {
            event_type: event_type.to_vec(),
            properties: properties.to_vec(),
        })
        .await?;
        Ok(())
    }

    pub async fn dispatch_text_input(&self, text: &[u8]) -> Result<()> {
        self.invoke(SessionCall::DispatchTextInput {
            text: text.to_vec(),
        })
        .await?;
        Ok(())
    }
}

/// Binder that connects the manager to an in-process [`OrbServiceHost`].
pub struct LoopbackBinder {
    host: Arc<OrbServiceHost>,
    events_tx: mpsc::UnboundedSender<BinderEvent>,
    resolvable: AtomicBool,
}

impl LoopbackBinder {
    /// Creates the binder and the event channel the connection manager
    /// consumes.
    pub fn new(host: Arc<OrbServiceHost>) -> (Self, mpsc::UnboundedReceiver<BinderEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                host,
                events_tx,
                resolvable: AtomicBool::new(true),
            },
            events_rx,
        )
    }

    /// Makes resolution return no candidates while leaving binding
    /// functional, mirroring a service installed without a matching
    /// entry in the service registry.
    pub fn hide_from_resolution(&self) {
        self.resolvable.store(false, Ordering::SeqCst);
    }

    /// Simulates the service process going away: the host forgets its
    /// callback and a disconnect notification is delivered.
    pub fn drop_connection(&self) {
        self.host.drop_callback();
        let _ = self.events_tx.send(BinderEvent::Disconnected);
    }
}

impl ServiceBinder for LoopbackBinder {
    fn resolve(&self, endpoint: &ServiceEndpoint) -> Vec<ResolvedService> {
        if self.resolvable.load(Ordering::SeqCst) {
            vec![ResolvedService {
                namespace: endpoint.namespace().to_string(),
                entry_point: endpoint.entry_point().to_string(),
            }]
        } else {
            Vec::new()
        }
    }

    fn bind(&self, _endpoint: &ServiceEndpoint) -> Result<()> {
        let port = Arc::new(LoopbackPort {
            host: Arc::clone(&self.host),
        });
        let handle = ConnectionHandle::new(port);
        self.events_tx
            .send(BinderEvent::Connected(handle))
            .map_err(|_| Error::BindFailed("binder event channel closed".into()))
    }
}

struct LoopbackPort {
    host: Arc<OrbServiceHost>,
}

impl SessionPort for LoopbackPort {
    fn initialise(&self, callback: Arc<dyn BrowserSession>) -> PortFuture<'_, ()> {
        Box::pin(async move { self.host.register_callback(callback) })
    }

    fn execute_request(&self, request: Vec<u8>) -> PortFuture<'_, Vec<u8>> {
        Box::pin(async move { self.host.handle_execute_request(request) })
    }
}
