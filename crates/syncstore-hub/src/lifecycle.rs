//! Hub lifecycle: obtain storage, install the listener, announce.
//!
//! Fail-stop: if the store cannot be opened no listener is installed, a single
//! `sync-storage:unavailable` is broadcast and the hub stays inert. Replies
//! go back to the connection a request arrived on, never to other peers.

use std::sync::Arc;

use syncstore_core::Announcement;

use crate::dispatch::{Dispatcher, OperationTable};
use crate::obs::HubMetrics;
use crate::policy::PermissionPolicy;
use crate::storage::{KeyValueStore, StorageError, StorageResult};
use crate::transport::{MessageBus, OutboundPort, Subscription, TargetOrigin};

/// Outcome of `install`.
#[derive(Debug)]
pub enum HubStatus {
    /// Listener installed; dropping the subscription tears it down.
    Ready(Subscription),
    Unavailable(StorageError),
}

impl HubStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, HubStatus::Ready(_))
    }

    /// What a peer is told about this hub when it connects.
    pub fn announcement(&self) -> Announcement {
        match self {
            HubStatus::Ready(_) => Announcement::Ready,
            HubStatus::Unavailable(_) => Announcement::Unavailable,
        }
    }
}

pub fn install<F>(
    bus: &Arc<MessageBus>,
    policy: Arc<PermissionPolicy>,
    open_store: F,
    port: Arc<dyn OutboundPort>,
    metrics: Arc<HubMetrics>,
) -> HubStatus
where
    F: FnOnce() -> StorageResult<Arc<dyn KeyValueStore>>,
{
    let store = match open_store() {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "storage unavailable; listener not installed");
            announce(port.as_ref(), Announcement::Unavailable);
            return HubStatus::Unavailable(e);
        }
    };

    let dispatcher = Dispatcher::new(policy, OperationTable::new(store), metrics);
    let reply_port = Arc::clone(&port);
    let sub = bus.subscribe(move |ev| {
        let Some(out) = dispatcher.handle(&ev.origin, &ev.data) else {
            return;
        };
        if let Err(e) = reply_port.reply(ev.source, &out.target, out.payload) {
            tracing::warn!(peer_id = ev.source, reply_to = %out.target, error = %e, "reply not posted");
        }
    });

    announce(port.as_ref(), Announcement::Ready);
    HubStatus::Ready(sub)
}

fn announce(port: &dyn OutboundPort, a: Announcement) {
    match port.broadcast(&TargetOrigin::Any, a.as_str().to_string()) {
        Ok(n) => tracing::info!(announcement = a.as_str(), peers = n, "announced"),
        Err(e) => tracing::warn!(announcement = a.as_str(), error = %e, "announcement not posted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use syncstore_core::error::Result;

    use crate::storage::MemoryStore;
    use crate::transport::{MessageEvent, PeerId};

    // `None` marks a broadcast.
    type Sent = (Option<PeerId>, TargetOrigin, String);

    #[derive(Default)]
    struct RecordingPort(Mutex<Vec<Sent>>);

    impl OutboundPort for RecordingPort {
        fn reply(&self, to: PeerId, target: &TargetOrigin, text: String) -> Result<bool> {
            self.0.lock().unwrap().push((Some(to), target.clone(), text));
            Ok(true)
        }

        fn broadcast(&self, target: &TargetOrigin, text: String) -> Result<usize> {
            self.0.lock().unwrap().push((None, target.clone(), text));
            Ok(1)
        }
    }

    impl RecordingPort {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn memory() -> StorageResult<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(MemoryStore::new(None)))
    }

    #[test]
    fn ready_is_announced_after_install() {
        let bus = MessageBus::new();
        let port = Arc::new(RecordingPort::default());
        let status = install(
            &bus,
            Arc::new(PermissionPolicy::deny_all()),
            memory,
            port.clone(),
            Arc::new(HubMetrics::default()),
        );
        assert!(status.is_ready());
        assert_eq!(bus.listener_count(), 1);
        assert_eq!(status.announcement(), Announcement::Ready);
        assert_eq!(port.take(), vec![(None, TargetOrigin::Any, "sync-storage:ready".to_string())]);

        bus.deliver(&MessageEvent::new(4, "https://a.test", "sync-storage:poll"));
        assert_eq!(
            port.take(),
            vec![(
                Some(4),
                TargetOrigin::Exact("https://a.test".into()),
                "sync-storage:ready".to_string()
            )]
        );
    }

    #[test]
    fn unavailable_store_installs_nothing() {
        let bus = MessageBus::new();
        let port = Arc::new(RecordingPort::default());
        let status = install(
            &bus,
            Arc::new(PermissionPolicy::deny_all()),
            || Err(StorageError::Io("denied".into())),
            port.clone(),
            Arc::new(HubMetrics::default()),
        );
        assert!(matches!(status, HubStatus::Unavailable(StorageError::Io(_))));
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(status.announcement(), Announcement::Unavailable);
        assert_eq!(
            port.take(),
            vec![(None, TargetOrigin::Any, "sync-storage:unavailable".to_string())]
        );

        bus.deliver(&MessageEvent::new(1, "https://a.test", "sync-storage:poll"));
        assert!(port.take().is_empty());
    }

    #[test]
    fn dropping_the_subscription_tears_down() {
        let bus = MessageBus::new();
        let port = Arc::new(RecordingPort::default());
        let status = install(
            &bus,
            Arc::new(PermissionPolicy::deny_all()),
            memory,
            port.clone(),
            Arc::new(HubMetrics::default()),
        );
        port.take();
        drop(status);
        assert_eq!(bus.listener_count(), 0);
        bus.deliver(&MessageEvent::new(1, "https://a.test", "sync-storage:poll"));
        assert!(port.take().is_empty());
    }
}
