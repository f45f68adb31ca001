//! Publish-subscribe fan-out for a single turn's output stream (`spec.md`
//! §4.9). Grounded in shape on the (now-superseded) per-connection outbound
//! channel the ancestor gateway used for its node WebSocket relay, stripped
//! of the node-registry/auth/request-response protocol it layered on top —
//! here a subscriber is just a bounded `mpsc` receiver keyed by session.

use std::collections::HashMap;
use std::sync::Arc;

use lg_memory::ledger::LedgerSummary;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// One of the four channels named in `spec.md` §4.9. `Text` carries both
/// `progress` and `final` bytes — they share one ordered byte stream framed
/// by the Turn Driver's control tokens; `Image`/`Stats` are distinct typed
/// events that interleave with it.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Text(String),
    Image { base64_png: String, width: u32, height: u32 },
    Stats(LedgerSummary),
}

/// Fan-out for a single session's turn stream. Subscribers that join mid-turn
/// only see events published after they subscribed — there is no replay.
pub struct SessionTransport {
    subscribers: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
    buffer: usize,
    /// Every `Text` chunk published so far, in order. The Turn Driver drains
    /// this once a turn ends to persist what subscribers actually saw
    /// (`spec.md` §4.8) instead of reconstructing it separately.
    text_log: Mutex<String>,
}

impl SessionTransport {
    pub fn new(buffer: usize) -> Self {
        Self { subscribers: Mutex::new(Vec::new()), buffer, text_log: Mutex::new(String::new()) }
    }

    pub fn subscribe(&self) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Fan a single event out to every live subscriber. A full buffer means a
    /// slow subscriber; drop it rather than block the turn (`spec.md` §4.9 /
    /// §5: "the turn must never await a subscriber").
    pub fn publish(&self, event: TransportEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("dropping slow transport subscriber: buffer full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub fn publish_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.text_log.lock().push_str(&text);
        self.publish(TransportEvent::Text(text));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns everything published via `publish_text` since the last drain
    /// and resets the log, so each turn persists only its own output.
    pub fn take_text_log(&self) -> String {
        std::mem::take(&mut *self.text_log.lock())
    }
}

/// Registry of per-session transports. A session's transport is created on
/// first use and torn down explicitly once its turn completes and all
/// subscribers have drained — callers own that lifecycle via `remove`.
pub struct Transport {
    sessions: Mutex<HashMap<String, Arc<SessionTransport>>>,
    buffer: usize,
}

impl Transport {
    pub fn new(buffer: usize) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), buffer }
    }

    pub fn session(&self, session_key: &str) -> Arc<SessionTransport> {
        self.sessions
            .lock()
            .entry(session_key.to_owned())
            .or_insert_with(|| Arc::new(SessionTransport::new(self.buffer)))
            .clone()
    }

    pub fn remove(&self, session_key: &str) {
        self.sessions.lock().remove(session_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_events_published_after_join() {
        let transport = SessionTransport::new(4);
        transport.publish_text("before");
        let mut rx = transport.subscribe();
        transport.publish_text("after");
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::Text(t) if t == "after"));
    }

    #[tokio::test]
    async fn full_buffer_drops_subscriber_without_blocking() {
        let transport = SessionTransport::new(1);
        let mut rx = transport.subscribe();
        transport.publish_text("one");
        transport.publish_text("two"); // rx hasn't drained "one" yet — buffer full, subscriber dropped
        assert_eq!(transport.subscriber_count(), 0);
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, TransportEvent::Text(t) if t == "one"));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn take_text_log_drains_and_resets() {
        let transport = SessionTransport::new(4);
        transport.publish_text("a");
        transport.publish_text("b");
        assert_eq!(transport.take_text_log(), "ab");
        transport.publish_text("c");
        assert_eq!(transport.take_text_log(), "c");
    }

    #[test]
    fn sessions_are_independent() {
        let transport = Transport::new(4);
        let a = transport.session("a");
        let b = transport.session("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &transport.session("a")));
        transport.remove("a");
    }
}
