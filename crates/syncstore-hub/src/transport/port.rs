use std::fmt;

use syncstore_core::error::Result;

/// Origin value some transports report for sandboxed or opaque senders.
pub const OPAQUE_ORIGIN: &str = "null";

/// Transport-assigned handle of one connected peer.
pub type PeerId = u64;

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Connection the message arrived on. Replies go back to it alone.
    pub source: PeerId,
    /// Sender origin; trusted as the authorization principal.
    pub origin: String,
    pub data: String,
}

impl MessageEvent {
    pub fn new(source: PeerId, origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source,
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// Origin an outbound message may be handed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    Exact(String),
    /// Wildcard (`*`): any receiving origin is accepted.
    Any,
}

impl TargetOrigin {
    /// Target origin for a reply. The opaque origin cannot be named, so the
    /// reply is addressed with `*`; it still only goes to the sender.
    pub fn reply_to(origin: &str) -> Self {
        if origin == OPAQUE_ORIGIN {
            TargetOrigin::Any
        } else {
            TargetOrigin::Exact(origin.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetOrigin::Exact(o) => o,
            TargetOrigin::Any => "*",
        }
    }

    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            TargetOrigin::Exact(o) => o == origin,
            TargetOrigin::Any => true,
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sending side of the transport.
pub trait OutboundPort: Send + Sync {
    /// Hand `text` to the single connection `to`, if its origin is accepted by
    /// `target`. Returns whether it was handed over.
    fn reply(&self, to: PeerId, target: &TargetOrigin, text: String) -> Result<bool>;

    /// Hand `text` to every connection whose origin `target` accepts. Only
    /// lifecycle announcements go this way. Returns how many peers got it.
    fn broadcast(&self, target: &TargetOrigin, text: String) -> Result<usize>;
}
