use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use syncstore_core::error::Result;

use super::port::{OutboundPort, PeerId, TargetOrigin};

/// One peer connection's outbound queue sender.
#[derive(Clone)]
pub struct PeerConnection {
    pub origin: Arc<str>,
    pub tx: mpsc::Sender<Message>,
}

impl PeerConnection {
    // Lossy: a peer whose queue is full or closed misses the message.
    fn send(&self, id: PeerId, text: String) -> bool {
        match self.tx.try_send(Message::Text(text)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(peer_id = id, origin = %self.origin, error = %e, "peer outbound queue rejected message");
                false
            }
        }
    }
}

/// Connected peers, keyed by the id handed out on `insert`.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, PeerConnection>,
    seq: AtomicU64,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, origin: &str, tx: mpsc::Sender<Message>) -> PeerId {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        self.peers.insert(
            id,
            PeerConnection {
                origin: Arc::from(origin),
                tx,
            },
        );
        id
    }

    pub fn remove(&self, id: PeerId) -> Option<PeerConnection> {
        self.peers.remove(&id).map(|(_, conn)| conn)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Connections whose origin `target` accepts.
    pub fn targets(&self, target: &TargetOrigin) -> Vec<(PeerId, PeerConnection)> {
        self.peers
            .iter()
            .filter(|e| target.accepts(&e.value().origin))
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }
}

impl OutboundPort for PeerRegistry {
    fn reply(&self, to: PeerId, target: &TargetOrigin, text: String) -> Result<bool> {
        let Some(conn) = self.peers.get(&to).map(|e| e.value().clone()) else {
            tracing::debug!(peer_id = to, "reply dropped: peer gone");
            return Ok(false);
        };
        if !target.accepts(&conn.origin) {
            tracing::warn!(peer_id = to, origin = %conn.origin, reply_to = %target, "reply dropped: origin mismatch");
            return Ok(false);
        }
        Ok(conn.send(to, text))
    }

    fn broadcast(&self, target: &TargetOrigin, text: String) -> Result<usize> {
        let delivered = self
            .targets(target)
            .into_iter()
            .filter(|(id, conn)| conn.send(*id, text.clone()))
            .count();
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(m: Option<Message>) -> Option<String> {
        match m {
            Some(Message::Text(s)) => Some(s),
            _ => None,
        }
    }

    #[tokio::test]
    async fn reply_reaches_only_the_addressed_connection() {
        let reg = PeerRegistry::new();
        let (a_tx, mut a_rx) = mpsc::channel(4);
        let (twin_tx, mut twin_rx) = mpsc::channel(4);
        let (b_tx, mut b_rx) = mpsc::channel(4);
        let a = reg.insert("https://a.test", a_tx);
        reg.insert("https://a.test", twin_tx);
        reg.insert("https://b.test", b_tx);

        assert!(reg
            .reply(a, &TargetOrigin::Exact("https://a.test".into()), "hi".into())
            .unwrap());
        assert_eq!(text(a_rx.recv().await).as_deref(), Some("hi"));
        assert!(twin_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn wildcard_reply_still_goes_to_one_connection() {
        let reg = PeerRegistry::new();
        let (opaque_tx, mut opaque_rx) = mpsc::channel(4);
        let (other_tx, mut other_rx) = mpsc::channel(4);
        let opaque = reg.insert("null", opaque_tx);
        reg.insert("https://evil.test", other_tx);

        assert!(reg.reply(opaque, &TargetOrigin::Any, "secret".into()).unwrap());
        assert_eq!(text(opaque_rx.recv().await).as_deref(), Some("secret"));
        assert!(other_rx.try_recv().is_err());
    }

    #[test]
    fn reply_is_filtered_by_target_origin() {
        let reg = PeerRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        let id = reg.insert("https://a.test", tx);

        let sent = reg
            .reply(id, &TargetOrigin::Exact("https://b.test".into()), "x".into())
            .unwrap();
        assert!(!sent);
        assert!(rx.try_recv().is_err());

        assert!(!reg.reply(id + 100, &TargetOrigin::Any, "x".into()).unwrap());
    }

    #[tokio::test]
    async fn broadcast_honours_the_target() {
        let reg = PeerRegistry::new();
        let (a_tx, mut a_rx) = mpsc::channel(4);
        let (b_tx, mut b_rx) = mpsc::channel(4);
        reg.insert("https://a.test", a_tx);
        reg.insert("null", b_tx);

        assert_eq!(reg.broadcast(&TargetOrigin::Any, "x".into()).unwrap(), 2);
        assert_eq!(text(a_rx.recv().await).as_deref(), Some("x"));
        assert_eq!(text(b_rx.recv().await).as_deref(), Some("x"));

        let n = reg
            .broadcast(&TargetOrigin::Exact("https://a.test".into()), "y".into())
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(text(a_rx.recv().await).as_deref(), Some("y"));
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn remove_forgets_the_peer() {
        let reg = PeerRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = reg.insert("https://a.test", tx);
        assert_eq!(reg.len(), 1);
        assert!(reg.remove(id).is_some());
        assert!(reg.is_empty());
        assert!(reg.targets(&TargetOrigin::Any).is_empty());
        assert!(reg.remove(id).is_none());
    }
}
