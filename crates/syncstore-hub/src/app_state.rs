//! Shared application state for the syncstore hub.
//!
//! Compiles the policy, installs the hub on the message bus and owns the
//! inbound queue feeding the single listener thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use syncstore_core::error::{Result, SyncStoreError};

use crate::config::HubConfig;
use crate::lifecycle::{self, HubStatus};
use crate::obs::HubMetrics;
use crate::policy::PermissionPolicy;
use crate::storage;
use crate::transport::{MessageBus, MessageEvent, OutboundPort, PeerId, PeerRegistry, TargetOrigin};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: HubConfig,
    peers: Arc<PeerRegistry>,
    metrics: Arc<HubMetrics>,
    inbound: mpsc::Sender<MessageEvent>,
    status: HubStatus,
}

/// Receiving end of the inbound queue. Runs every message through the bus on
/// one thread, strictly in arrival order.
pub struct Pump {
    rx: mpsc::Receiver<MessageEvent>,
    bus: Arc<MessageBus>,
}

impl Pump {
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("syncstore-listener".into())
            .spawn(move || {
                while let Some(ev) = self.rx.blocking_recv() {
                    self.bus.deliver(&ev);
                }
                tracing::debug!("inbound queue closed; listener thread exiting");
            })
    }
}

impl AppState {
    /// Build application state. Policy errors abort startup; an unavailable
    /// store does not (the hub just stays inert).
    pub fn new(cfg: HubConfig) -> Result<(Self, Pump)> {
        let policy = PermissionPolicy::compile(&cfg.permissions)
            .map_err(|e| SyncStoreError::BadRequest(format!("policy compile failed: {e}")))?;
        tracing::info!(entries = policy.len(), "permission policy compiled");

        let bus = MessageBus::new();
        let peers = Arc::new(PeerRegistry::new());
        let metrics = Arc::new(HubMetrics::default());

        let port: Arc<dyn OutboundPort> = peers.clone();
        let status = lifecycle::install(
            &bus,
            Arc::new(policy),
            || storage::open(&cfg.storage),
            port,
            Arc::clone(&metrics),
        );

        let (inbound, rx) = mpsc::channel(cfg.server.inbound_queue);

        let state = Self {
            inner: Arc::new(AppStateInner {
                cfg,
                peers,
                metrics,
                inbound,
                status,
            }),
        };
        Ok((state, Pump { rx, bus }))
    }

    pub fn cfg(&self) -> &HubConfig {
        &self.inner.cfg
    }

    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.inner.peers
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.inner.metrics
    }

    pub fn is_available(&self) -> bool {
        self.inner.status.is_ready()
    }

    /// `Err(Unavailable)` when the store could not be opened at startup.
    pub fn availability(&self) -> Result<()> {
        match &self.inner.status {
            HubStatus::Ready(_) => Ok(()),
            HubStatus::Unavailable(e) => Err(SyncStoreError::Unavailable(e.to_string())),
        }
    }

    /// Register a peer connection and tell it whether the hub is up. The
    /// startup broadcast predates every connection, so each peer is greeted
    /// on arrival instead.
    pub fn connect(&self, origin: &str, tx: mpsc::Sender<Message>) -> PeerId {
        let peer = self.inner.peers.insert(origin, tx);
        self.inner.metrics.peers_connected.inc();

        let greeting = self.inner.status.announcement();
        match self
            .inner
            .peers
            .reply(peer, &TargetOrigin::Any, greeting.as_str().to_string())
        {
            Ok(true) => tracing::debug!(peer_id = peer, announcement = greeting.as_str(), "peer greeted"),
            Ok(false) => tracing::debug!(peer_id = peer, "greeting not delivered"),
            Err(e) => tracing::warn!(peer_id = peer, error = %e, "greeting not posted"),
        }
        peer
    }

    pub fn disconnect(&self, peer: PeerId) {
        if self.inner.peers.remove(peer).is_some() {
            self.inner.metrics.peers_connected.dec();
        }
    }

    /// Queue a message for the listener thread.
    pub async fn enqueue(&self, ev: MessageEvent) -> Result<()> {
        self.inner
            .inbound
            .send(ev)
            .await
            .map_err(|_| SyncStoreError::Internal("inbound queue closed".into()))
    }
}
