//! Wire types for the Orb session boundary.
//!
//! This crate contains the serde-serializable shapes that cross the
//! inter-process boundary between the browser host and the Orb service.
//! Payload parameters (URLs, event types, event properties, text input)
//! are opaque byte sequences: the two processes do not share a text
//! encoding or a structured-data format, so each side deserializes its
//! payloads independently.
//!
//! Types in this crate are pure data; behavior lives in `orb-bridge`.

use serde::{Deserialize, Serialize};

/// Key action code for a key press.
pub const KEY_ACTION_DOWN: i32 = 0;
/// Key action code for a key release.
pub const KEY_ACTION_UP: i32 = 1;

/// Inbound call from the Orb service to the browser's session callback.
///
/// Serialized as `{"method": "...", "params": {...}}` with camelCase
/// names on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum SessionCall {
    /// Route a key press/release to the active application.
    #[serde(rename_all = "camelCase")]
    DispatchKeyEvent {
        /// Press or release, see [`KEY_ACTION_DOWN`] / [`KEY_ACTION_UP`].
        action: i32,
        /// Platform key code.
        key_code: i32,
        /// Normalized (TV) key code.
        tv_code: i32,
    },
    /// Begin loading the named application at the given URL.
    #[serde(rename_all = "camelCase")]
    LoadApplication {
        app_id: i32,
        url: Vec<u8>,
        graphic_ids: Vec<i32>,
    },
    /// Make the currently loaded application visible.
    ShowApplication,
    /// Hide the currently loaded application without unloading it.
    HideApplication,
    /// Deliver a generic application-level event.
    #[serde(rename_all = "camelCase")]
    DispatchEvent {
        event_type: Vec<u8>,
        properties: Vec<u8>,
    },
    /// Deliver text input to the active application.
    #[serde(rename_all = "camelCase")]
    DispatchTextInput { text: Vec<u8> },
}

/// Reply to an inbound session call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "value", rename_all = "camelCase")]
pub enum SessionReply {
    /// `dispatchKeyEvent` result: whether the browser consumed the key.
    /// The caller awaits this before falling back to default handling.
    Consumed(bool),
    /// Acknowledgement for the void operations.
    Ack,
}
