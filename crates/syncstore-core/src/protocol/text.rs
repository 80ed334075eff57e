//! Text envelopes (JSON) and handshake announcements.
//!
//! Requests keep `params` as `RawValue` so each operation parses its own shape
//! lazily, after authorization.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::{Result, SyncStoreError};

use super::NAMESPACE;

/// Request envelope as sent by a peer document.
///
/// Unknown fields are tolerated: the channel may be shared with other
/// protocols that add their own keys.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Opaque correlation token, echoed back verbatim.
    #[serde(default)]
    pub id: Value,
    /// `"sync-storage:<operation>"`.
    pub method: String,
    /// Operation-specific payload, parsed lazily.
    #[serde(default)]
    pub params: Option<Box<RawValue>>,
}

/// Lifecycle announcements (plain text, no id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Ready,
    Unavailable,
}

impl Announcement {
    pub fn as_str(self) -> &'static str {
        match self {
            Announcement::Ready => "sync-storage:ready",
            Announcement::Unavailable => "sync-storage:unavailable",
        }
    }
}

/// Plain-text poll sent by peers that wait for the hub to come up.
pub const POLL: &str = "sync-storage:poll";

/// A decoded storage call. `operation` is the raw name after the namespace;
/// it is resolved against the closed operation set by the dispatcher.
#[derive(Debug)]
pub struct Call {
    pub id: Value,
    pub operation: String,
    pub params: Option<Box<RawValue>>,
}

/// What an inbound message asks for.
#[derive(Debug)]
pub enum Command {
    /// Another hub announcing itself. Never answered.
    Ready,
    /// A peer asking whether the hub is up.
    Poll,
    Call(Call),
}

/// Decode raw text into a command.
///
/// Errors mean "not ours": the caller drops the message without replying.
pub fn decode(raw: &str) -> Result<Command> {
    if raw == Announcement::Ready.as_str() {
        return Ok(Command::Ready);
    }
    if raw == POLL {
        return Ok(Command::Poll);
    }

    let env: Envelope = serde_json::from_str(raw)
        .map_err(|e| SyncStoreError::BadRequest(format!("invalid envelope json: {e}")))?;

    let operation = env
        .method
        .strip_prefix(NAMESPACE)
        .and_then(|rest| rest.strip_prefix(':'))
        .filter(|op| !op.is_empty())
        .ok_or_else(|| SyncStoreError::BadRequest(format!("foreign method: {}", env.method)))?;

    Ok(match operation {
        "ready" => Command::Ready,
        "poll" => Command::Poll,
        _ => Command::Call(Call {
            id: env.id,
            operation: operation.to_string(),
            params: env.params,
        }),
    })
}

/// Response envelope. Absent fields are omitted; `Some(Value::Null)` is
/// written as `"result": null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    pub fn ok(id: Value, result: Option<Value>) -> Self {
        Self { id, error: None, result }
    }

    pub fn err(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(error.into()),
            result: None,
        }
    }
}

/// Encode a response to text.
pub fn encode(resp: &Response) -> Result<String> {
    serde_json::to_string(resp)
        .map_err(|e| SyncStoreError::Internal(format!("json encode failed: {e}")))
}
