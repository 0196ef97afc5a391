//! Correlation of forwarded calls with out-of-band engine replies.
//!
//! Every forwarded call owns one entry in the pending table, keyed by its
//! sequence number and bound to the engine channel it was sent on. The entry
//! ends in exactly one of three ways: a matching reply arrives on that
//! channel, the deadline passes, or the channel goes away. Replies that find
//! no entry are dropped.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nal2_core::{CallError, CallRequest, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::channel::{ChannelId, Role, ServerMessage};
use super::registry::ChannelRegistry;

type Resolver = oneshot::Sender<Result<Value>>;
type PendingTable = Mutex<HashMap<i64, PendingCall>>;

struct PendingCall {
    /// Distinguishes a reused sequence number from the call that first held it
    ticket: u64,
    channel: ChannelId,
    created_at: Instant,
    resolver: Resolver,
}

/// Removes the caller's entry when its `forward` future finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    sequence_num: i64,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        match pending.entry(self.sequence_num) {
            Entry::Occupied(entry) if entry.get().ticket == self.ticket => {
                entry.remove();
                debug!("Pending call {} released", self.sequence_num);
            }
            _ => {}
        }
    }
}

pub struct CorrelationBroker {
    registry: Arc<ChannelRegistry>,
    pending: PendingTable,
    timeout: Duration,
    next_ticket: AtomicU64,
}

impl CorrelationBroker {
    pub fn new(registry: Arc<ChannelRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            pending: Mutex::new(HashMap::new()),
            timeout,
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Number of calls awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Send `request` to the registered engine and wait for its reply payload.
    ///
    /// Fails immediately with [`CallError::EngineUnavailable`] when no engine
    /// is registered. Otherwise resolves with the reply, or with
    /// [`CallError::Timeout`] once the deadline passes, or with
    /// [`CallError::ChannelLost`] when the engine channel is superseded or
    /// closes first.
    pub async fn forward(&self, request: CallRequest) -> Result<Value> {
        let engine = self
            .registry
            .get(Role::Engine)
            .ok_or(CallError::EngineUnavailable)?;

        let sequence_num = request.sequence_num;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let created_at = Instant::now();
        let deadline = created_at + self.timeout;
        let (resolver, reply) = oneshot::channel();

        let previous = self.pending.lock().insert(
            sequence_num,
            PendingCall {
                ticket,
                channel: engine.id(),
                created_at,
                resolver,
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            sequence_num,
            ticket,
        };
        if let Some(previous) = previous {
            warn!(
                "Sequence number {} reused while pending, failing the earlier call",
                sequence_num
            );
            let _ = previous.resolver.send(Err(CallError::ChannelLost));
        }

        // the engine may have left between lookup and insert
        if !self.registry.is_current(Role::Engine, engine.id()) {
            return Err(CallError::ChannelLost);
        }
        if engine
            .send(ServerMessage::Nal2Request { data: request })
            .is_err()
        {
            warn!("Engine channel {} closed before call {} was sent", engine.id(), sequence_num);
            return Err(CallError::ChannelLost);
        }
        debug!("Call {} forwarded on {}", sequence_num, engine.id());

        match tokio::time::timeout_at(deadline, reply).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(CallError::ChannelLost),
            Err(_) => {
                warn!(
                    "Call {} timed out after {:?}",
                    sequence_num,
                    created_at.elapsed()
                );
                Err(CallError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }

    /// Deliver a reply received on `channel`. Returns false when no call
    /// forwarded on that channel is waiting for `sequence_num`.
    pub fn resolve(&self, channel: ChannelId, sequence_num: i64, result: Value) -> bool {
        let call = {
            let mut pending = self.pending.lock();
            match pending.entry(sequence_num) {
                Entry::Occupied(entry) if entry.get().channel == channel => entry.remove(),
                _ => {
                    debug!("Dropping unmatched reply {} from {}", sequence_num, channel);
                    return false;
                }
            }
        };
        debug!(
            "Call {} resolved after {:?}",
            sequence_num,
            call.created_at.elapsed()
        );
        if call.resolver.send(Ok(result)).is_err() {
            debug!("Caller of {} went away before the reply", sequence_num);
        }
        true
    }

    /// Fail every call bound to `channel`. Returns how many were failed.
    pub fn channel_lost(&self, channel: ChannelId) -> usize {
        let lost: Vec<PendingCall> = {
            let mut pending = self.pending.lock();
            let keys: Vec<i64> = pending
                .iter()
                .filter(|(_, call)| call.channel == channel)
                .map(|(sequence_num, _)| *sequence_num)
                .collect();
            keys.iter().filter_map(|key| pending.remove(key)).collect()
        };
        if !lost.is_empty() {
            warn!("Channel {} lost with {} calls pending", channel, lost.len());
        }
        let count = lost.len();
        for call in lost {
            let _ = call.resolver.send(Err(CallError::ChannelLost));
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::channel::ChannelHandle;
    use serde_json::{Map, json};
    use tokio::sync::mpsc;

    fn broker(timeout: Duration) -> (Arc<CorrelationBroker>, Arc<ChannelRegistry>) {
        let registry = Arc::new(ChannelRegistry::new());
        let broker = Arc::new(CorrelationBroker::new(Arc::clone(&registry), timeout));
        (broker, registry)
    }

    fn request(seq: i64) -> CallRequest {
        CallRequest::new(seq, "dllVersion", Map::new())
    }

    fn engine(registry: &ChannelRegistry) -> (ChannelHandle, mpsc::UnboundedReceiver<ServerMessage>) {
        let (handle, rx) = ChannelHandle::new();
        registry.register(Role::Engine, handle.clone());
        (handle, rx)
    }

    #[tokio::test]
    async fn test_fails_fast_without_engine() {
        let (broker, _) = broker(Duration::from_secs(30));
        let started = std::time::Instant::now();
        let err = broker.forward(request(1)).await.unwrap_err();
        assert_eq!(err, CallError::EngineUnavailable);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_reply_resolves_matching_call() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (handle, mut rx) = engine(&registry);

        let call = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.forward(request(7)).await }
        });

        let Some(ServerMessage::Nal2Request { data }) = rx.recv().await else {
            panic!("expected a forwarded call");
        };
        assert_eq!(data.sequence_num, 7);
        assert!(broker.resolve(handle.id(), 7, json!({"return": 0})));
        // duplicates are ignored
        assert!(!broker.resolve(handle.id(), 7, json!({"return": 0})));

        assert_eq!(call.await.unwrap().unwrap(), json!({"return": 0}));
        assert_eq!(broker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_do_not_cross() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (handle, mut rx) = engine(&registry);

        let calls: Vec<_> = (0..20)
            .map(|seq| {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move { broker.forward(request(seq)).await })
            })
            .collect();

        // reply in reverse arrival order
        let mut received = Vec::new();
        for _ in 0..20 {
            if let Some(ServerMessage::Nal2Request { data }) = rx.recv().await {
                received.push(data.sequence_num);
            }
        }
        for seq in received.into_iter().rev() {
            assert!(broker.resolve(handle.id(), seq, json!({"sequence_num": seq})));
        }

        for (seq, call) in calls.into_iter().enumerate() {
            assert_eq!(call.await.unwrap().unwrap(), json!({"sequence_num": seq}));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_entry_and_drops_late_reply() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (handle, _rx) = engine(&registry);

        let started = Instant::now();
        let err = broker.forward(request(3)).await.unwrap_err();
        assert_eq!(err, CallError::Timeout(30_000));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(30));
        assert!(waited < Duration::from_secs(31));

        assert_eq!(broker.pending_count(), 0);
        assert!(!broker.resolve(handle.id(), 3, json!({})));
    }

    #[tokio::test]
    async fn test_supersede_fails_pending_calls() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (_first, mut rx) = engine(&registry);

        let call = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.forward(request(5)).await }
        });
        rx.recv().await.unwrap();

        let (second, _rx2) = ChannelHandle::new();
        let superseded = registry.register(Role::Engine, second.clone()).unwrap();
        assert_eq!(broker.channel_lost(superseded.id()), 1);

        assert_eq!(call.await.unwrap().unwrap_err(), CallError::ChannelLost);
        // the new engine cannot answer a call it never saw
        assert!(!broker.resolve(second.id(), 5, json!({})));
    }

    #[tokio::test]
    async fn test_reply_from_other_channel_is_ignored() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (_handle, mut rx) = engine(&registry);

        let call = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.forward(request(8)).await }
        });
        rx.recv().await.unwrap();

        let (stranger, _rx) = ChannelHandle::new();
        assert!(!broker.resolve(stranger.id(), 8, json!({})));
        assert_eq!(broker.pending_count(), 1);
        call.abort();
    }

    #[tokio::test]
    async fn test_abandoned_caller_leaves_no_entry() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (handle, mut rx) = engine(&registry);

        let call = tokio::spawn({
            let broker = Arc::clone(&broker);
            async move { broker.forward(request(11)).await }
        });
        rx.recv().await.unwrap();
        assert_eq!(broker.pending_count(), 1);

        call.abort();
        let _ = call.await;
        assert_eq!(broker.pending_count(), 0);
        assert!(!broker.resolve(handle.id(), 11, json!({})));
    }

    #[tokio::test]
    async fn test_closed_channel_fails_send() {
        let (broker, registry) = broker(Duration::from_secs(30));
        let (_handle, rx) = engine(&registry);
        drop(rx);

        let err = broker.forward(request(2)).await.unwrap_err();
        assert_eq!(err, CallError::ChannelLost);
        assert_eq!(broker.pending_count(), 0);
    }
}
