//! The session callback contract the Orb service drives.
//!
//! After a callback is registered, the remote service may invoke these
//! operations at any time, from its own execution context, concurrently
//! with the browser's threads and with each other. The boundary provides
//! no serialization of its own.

use orb_protocol::{SessionCall, SessionReply};
use std::sync::Arc;

/// Operations the remote Orb service invokes back into the browser.
///
/// Implementations must tolerate concurrent, unordered invocation.
/// [`dispatch_key_event`](BrowserSession::dispatch_key_event) is awaited
/// by the remote caller and must return promptly; the void operations are
/// fire-and-forget from the caller's perspective but should still avoid
/// unbounded blocking, since the transport may cap in-flight calls.
pub trait BrowserSession: Send + Sync {
    /// Routes a key press/release to the active application. Returns
    /// whether the event was consumed; the caller uses this to decide on
    /// fallback key handling.
    fn dispatch_key_event(&self, action: i32, key_code: i32, tv_code: i32) -> bool;

    /// Begins loading the named application at the given URL with the
    /// declared graphics capabilities.
    fn load_application(&self, app_id: i32, url: &[u8], graphic_ids: &[i32]);

    /// Makes the currently loaded application visible.
    fn show_application(&self);

    /// Hides the currently loaded application without unloading it.
    fn hide_application(&self);

    /// Delivers a generic application-level event.
    fn dispatch_event(&self, event_type: &[u8], properties: &[u8]);

    /// Delivers text input to the active application.
    fn dispatch_text_input(&self, text: &[u8]);
}

/// Placeholder session that ignores every callback.
///
/// This is the integration point a real browser fills in with an
/// implementation that drives its application manager.
#[derive(Debug, Default)]
pub struct StubBrowserSession;

impl BrowserSession for StubBrowserSession {
    fn dispatch_key_event(&self, _action: i32, _key_code: i32, _tv_code: i32) -> bool {
        false
    }

    fn load_application(&self, _app_id: i32, _url: &[u8], _graphic_ids: &[i32]) {}

    fn show_application(&self) {}

    fn hide_application(&self) {}

    fn dispatch_event(&self, _event_type: &[u8], _properties: &[u8]) {}

    fn dispatch_text_input(&self, _text: &[u8]) {}
}

/// Produces the fresh [`BrowserSession`] handed to the Orb service on
/// each successful bind.
///
/// The remote side cannot be assumed to retain a callback across
/// reconnects, so one session instance never outlives one connection.
pub trait SessionFactory: Send + Sync {
    fn create_session(&self) -> Arc<dyn BrowserSession>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> Arc<dyn BrowserSession> + Send + Sync,
{
    fn create_session(&self) -> Arc<dyn BrowserSession> {
        self()
    }
}

/// Decodes one inbound wire call onto the session, producing its reply.
pub fn dispatch_call(session: &dyn BrowserSession, call: SessionCall) -> SessionReply {
    match call {
        SessionCall::DispatchKeyEvent {
            action,
            key_code,
            tv_code,
        } => SessionReply::Consumed(session.dispatch_key_event(action, key_code, tv_code)),
        SessionCall::LoadApplication {
            app_id,
            url,
            graphic_ids,
        } => {
            session.load_application(app_id, &url, &graphic_ids);
            SessionReply::Ack
        }
        SessionCall::ShowApplication => {
            session.show_application();
            SessionReply::Ack
        }
        SessionCall::HideApplication => {
            session.hide_application();
            SessionReply::Ack
        }
        SessionCall::DispatchEvent {
            event_type,
            properties,
        } => {
            session.dispatch_event(&event_type, &properties);
            SessionReply::Ack
        }
        SessionCall::DispatchTextInput { text } => {
            session.dispatch_text_input(&text);
            SessionReply::Ack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orb_protocol::KEY_ACTION_DOWN;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSession {
        calls: Mutex<Vec<String>>,
    }

    impl BrowserSession for RecordingSession {
        fn dispatch_key_event(&self, action: i32, key_code: i32, _tv_code: i32) -> bool {
            self.calls.lock().push(format!("key:{action}:{key_code}"));
            action == KEY_ACTION_DOWN
        }

        fn load_application(&self, app_id: i32, url: &[u8], graphic_ids: &[i32]) {
            self.calls.lock().push(format!(
                "load:{app_id}:{}:{graphic_ids:?}",
                String::from_utf8_lossy(url)
            ));
        }

        fn show_application(&self) {
            self.calls.lock().push("show".into());
        }

        fn hide_application(&self) {
            self.calls.lock().push("hide".into());
        }

        fn dispatch_event(&self, event_type: &[u8], _properties: &[u8]) {
            self.calls
                .lock()
                .push(format!("event:{}", String::from_utf8_lossy(event_type)));
        }

        fn dispatch_text_input(&self, text: &[u8]) {
            self.calls
                .lock()
                .push(format!("text:{}", String::from_utf8_lossy(text)));
        }
    }

    #[test]
    fn key_dispatch_returns_consumption() {
        let session = RecordingSession::default();
        let reply = dispatch_call(
            &session,
            SessionCall::DispatchKeyEvent {
                action: KEY_ACTION_DOWN,
                key_code: 19,
                tv_code: 403,
            },
        );
        assert_eq!(reply, SessionReply::Consumed(true));
    }

    #[test]
    fn void_operations_reply_with_ack() {
        let session = RecordingSession::default();
        let reply = dispatch_call(
            &session,
            SessionCall::LoadApplication {
                app_id: 7,
                url: b"https://example.test/app".to_vec(),
                graphic_ids: vec![1, 2],
            },
        );
        assert_eq!(reply, SessionReply::Ack);

        dispatch_call(&session, SessionCall::ShowApplication);
        dispatch_call(&session, SessionCall::HideApplication);
        dispatch_call(
            &session,
            SessionCall::DispatchTextInput {
                text: b"abc".to_vec(),
            },
        );

        let calls = session.calls.lock();
        assert_eq!(
            *calls,
            vec![
                "load:7:https://example.test/app:[1, 2]".to_string(),
                "show".to_string(),
                "hide".to_string(),
                "text:abc".to_string(),
            ]
        );
    }

    #[test]
    fn stub_session_consumes_nothing() {
        let stub = StubBrowserSession;
        assert!(!stub.dispatch_key_event(KEY_ACTION_DOWN, 23, 461));
    }

    #[test]
    fn closures_act_as_session_factories() {
        let factory: Arc<dyn SessionFactory> =
            Arc::new(|| Arc::new(StubBrowserSession) as Arc<dyn BrowserSession>);
        let session = factory.create_session();
        assert!(!session.dispatch_key_event(KEY_ACTION_DOWN, 0, 0));
    }
}
