use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use syncstore_core::error::SyncStoreError;
use syncstore_core::protocol::{self, Announcement, Call, Command, Response};

use crate::obs::HubMetrics;
use crate::policy::{PermissionPolicy, PolicyDecision};
use crate::transport::TargetOrigin;

use super::table::OperationTable;

/// A reply for the connection the request arrived on. `target` is the
/// origin that connection must still have for the reply to be handed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub target: TargetOrigin,
    pub payload: String,
}

/// Per-message pipeline: decode, handshake fast paths, authorize, execute,
/// respond. Holds no mutable state; one call runs one message to completion.
pub struct Dispatcher {
    policy: Arc<PermissionPolicy>,
    table: OperationTable,
    metrics: Arc<HubMetrics>,
}

impl Dispatcher {
    pub fn new(policy: Arc<PermissionPolicy>, table: OperationTable, metrics: Arc<HubMetrics>) -> Self {
        Self {
            policy,
            table,
            metrics,
        }
    }

    /// Handle one inbound message. `None` means nothing is sent: the message
    /// was not ours, or was a `ready` announcement.
    pub fn handle(&self, origin: &str, raw: &str) -> Option<Outbound> {
        let cmd = protocol::decode(raw).ok()?;
        let target = TargetOrigin::reply_to(origin);

        match cmd {
            Command::Ready => {
                self.metrics.handshakes.inc(&[("kind", "ready")]);
                None
            }
            Command::Poll => {
                self.metrics.handshakes.inc(&[("kind", "poll")]);
                tracing::debug!(%origin, reply_to = %target, "poll: answering ready");
                Some(Outbound {
                    target,
                    payload: Announcement::Ready.as_str().to_string(),
                })
            }
            Command::Call(call) => {
                let resp = self.call(origin, call);
                Some(Outbound {
                    target,
                    payload: encode_or_fallback(&resp),
                })
            }
        }
    }

    fn call(&self, origin: &str, call: Call) -> Response {
        let Call {
            id,
            operation,
            params,
        } = call;

        let op = match self.policy.check(origin, &operation) {
            PolicyDecision::Permit(op) => op,
            PolicyDecision::Deny(reason) => {
                tracing::warn!(%origin, %operation, reason = reason.as_str(), "request denied");
                self.metrics
                    .requests
                    .inc(&[("operation", denied_label(&operation)), ("decision", "deny")]);
                return Response::err(id, SyncStoreError::NotAllowed(operation).to_string());
            }
        };

        self.metrics
            .requests
            .inc(&[("operation", op.as_str()), ("decision", "permit")]);

        let started = Instant::now();
        let outcome = self.table.execute(op, params.as_deref());
        self.metrics
            .dispatch_duration
            .observe(&[("operation", op.as_str())], started.elapsed());

        match outcome {
            Ok(result) => {
                tracing::debug!(%origin, operation = %op, "request served");
                Response::ok(id, result)
            }
            Err(e) => {
                tracing::warn!(%origin, operation = %op, error = %e, "operation failed");
                self.metrics
                    .operation_failures
                    .inc(&[("operation", op.as_str())]);
                Response::err(id, e.to_string())
            }
        }
    }
}

// Peer-supplied names are unbounded; keep metric cardinality fixed.
fn denied_label(name: &str) -> &'static str {
    syncstore_core::Operation::from_name(name)
        .map(|op| op.as_str())
        .unwrap_or("unknown")
}

fn encode_or_fallback(resp: &Response) -> String {
    protocol::encode(resp).unwrap_or_else(|e| {
        tracing::error!(error = %e, "response encode failed");
        json!({ "id": resp.id, "error": e.to_string() }).to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    use crate::policy::{OriginPattern, PermissionEntry};
    use crate::storage::MemoryStore;
    use syncstore_core::Operation;

    fn dispatcher(entries: Vec<PermissionEntry>) -> (Dispatcher, Arc<HubMetrics>) {
        let metrics = Arc::new(HubMetrics::default());
        let d = Dispatcher::new(
            Arc::new(PermissionPolicy::new(entries)),
            OperationTable::new(Arc::new(MemoryStore::new(None))),
            Arc::clone(&metrics),
        );
        (d, metrics)
    }

    fn json_of(out: &Outbound) -> Value {
        serde_json::from_str(&out.payload).unwrap()
    }

    #[test]
    fn foreign_and_malformed_traffic_is_dropped() {
        let (d, metrics) = dispatcher(vec![]);
        for raw in ["", "hello", "{", r#"{"id":1,"method":"chat:send"}"#, r#"{"method":5}"#] {
            assert_eq!(d.handle("https://a.test", raw), None, "{raw:?}");
        }
        assert!(metrics.render().lines().all(|l| l.starts_with('#') || l.contains("peers_connected")));
    }

    #[test]
    fn ready_is_never_answered() {
        let (d, _) = dispatcher(vec![]);
        assert_eq!(d.handle("https://a.test", "sync-storage:ready"), None);
        assert_eq!(d.handle("https://a.test", r#"{"method":"sync-storage:ready"}"#), None);
    }

    #[test]
    fn poll_bypasses_policy() {
        let (d, _) = dispatcher(vec![]);
        let out = d.handle("https://a.test", "sync-storage:poll").unwrap();
        assert_eq!(out.target, TargetOrigin::Exact("https://a.test".into()));
        assert_eq!(out.payload, "sync-storage:ready");
    }

    #[test]
    fn denied_call_names_operation() {
        let (d, metrics) = dispatcher(vec![]);
        let out = d
            .handle("https://a.test", r#"{"id":"x","method":"sync-storage:set","params":{"key":"k","value":"v"}}"#)
            .unwrap();
        let v = json_of(&out);
        assert_eq!(v["id"], "x");
        assert_eq!(v["error"], "Invalid permissions for set");
        assert!(v.get("result").is_none());
        assert_eq!(metrics.requests.get(&[("operation", "set"), ("decision", "deny")]), 1);
    }

    #[test]
    fn unknown_operation_is_denied_not_dispatched() {
        let (d, metrics) = dispatcher(vec![PermissionEntry::new(
            OriginPattern::glob("*").unwrap(),
            Operation::ALL,
        )]);
        let out = d
            .handle("https://a.test", r#"{"id":1,"method":"sync-storage:constructor"}"#)
            .unwrap();
        assert_eq!(json_of(&out)["error"], "Invalid permissions for constructor");
        assert_eq!(metrics.requests.get(&[("operation", "unknown"), ("decision", "deny")]), 1);
    }

    #[test]
    fn permitted_call_round_trips() {
        let (d, metrics) = dispatcher(vec![PermissionEntry::new(
            OriginPattern::exact("https://a.test"),
            [Operation::Get, Operation::Set],
        )]);
        let out = d
            .handle("https://a.test", r#"{"id":1,"method":"sync-storage:set","params":{"key":"k","value":"v"}}"#)
            .unwrap();
        assert_eq!(out.payload, r#"{"id":1}"#);

        let out = d
            .handle("https://a.test", r#"{"id":2,"method":"sync-storage:get","params":{"keys":["k"]}}"#)
            .unwrap();
        assert_eq!(out.payload, r#"{"id":2,"result":"v"}"#);
        assert_eq!(metrics.dispatch_duration.count(&[("operation", "get")]), 1);
    }

    #[test]
    fn operation_failure_becomes_error_response() {
        let (d, metrics) = dispatcher(vec![PermissionEntry::new(
            OriginPattern::exact("https://a.test"),
            [Operation::Get],
        )]);
        let out = d
            .handle("https://a.test", r#"{"id":3,"method":"sync-storage:get","params":{"nope":true}}"#)
            .unwrap();
        let v = json_of(&out);
        assert_eq!(v["id"], 3);
        assert!(v["error"].as_str().unwrap().contains("invalid params for get"));
        assert!(v.get("result").is_none());
        assert_eq!(metrics.operation_failures.get(&[("operation", "get")]), 1);
    }

    #[test]
    fn opaque_origin_replies_are_broadcast() {
        let (d, _) = dispatcher(vec![]);
        let out = d.handle("null", "sync-storage:poll").unwrap();
        assert_eq!(out.target, TargetOrigin::Any);

        let out = d
            .handle("null", r#"{"id":1,"method":"sync-storage:clear"}"#)
            .unwrap();
        assert_eq!(out.target, TargetOrigin::Any);
    }
}
