//! Per-user serialized message dispatch.
//!
//! Messages from one user are funneled through that user's mailbox and
//! processed in arrival order by a single worker task, so a session is
//! never mutated concurrently and a write call in progress always runs to
//! its terminal outcome before the user's next message. Different users'
//! workers run fully in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use provenant_types::message::{InboundMessage, UserId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Backpressure bound per user mailbox.
const MAILBOX_DEPTH: usize = 32;

/// Consumes one inbound message to completion. Implementations must turn
/// their own failures into user-facing replies; the dispatcher has nothing
/// useful to do with an error.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle_message(
        &self,
        msg: InboundMessage,
    ) -> impl std::future::Future<Output = ()> + Send;
}

/// Routes inbound messages to per-user worker tasks.
///
/// Workers are spawned on a user's first message and live until shutdown;
/// an idle mailbox is a few hundred bytes, and keeping it avoids any
/// window where a retiring worker could drop a just-queued message.
pub struct Dispatcher<H> {
    handler: Arc<H>,
    mailboxes: DashMap<UserId, mpsc::Sender<InboundMessage>>,
    cancel: CancellationToken,
}

impl<H: MessageHandler> Dispatcher<H> {
    pub fn new(handler: Arc<H>, cancel: CancellationToken) -> Self {
        Self {
            handler,
            mailboxes: DashMap::new(),
            cancel,
        }
    }

    /// Enqueue a message for its user's worker, spawning the worker on
    /// first contact. Applies backpressure when the user's mailbox is full.
    pub async fn dispatch(&self, msg: InboundMessage) {
        let sender = {
            let entry = self
                .mailboxes
                .entry(msg.user.clone())
                .or_insert_with(|| self.spawn_worker(msg.user.clone()));
            entry.value().clone()
        };
        if sender.send(msg).await.is_err() {
            // Only happens after shutdown has stopped the worker.
            warn!("worker already stopped, message dropped");
        }
    }

    /// Number of users with a live worker.
    pub fn worker_count(&self) -> usize {
        self.mailboxes.len()
    }

    fn spawn_worker(&self, user: UserId) -> mpsc::Sender<InboundMessage> {
        let (tx, mut rx) = mpsc::channel::<InboundMessage>(MAILBOX_DEPTH);
        let handler = Arc::clone(&self.handler);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            debug!(%user, "worker started");
            loop {
                tokio::select! {
                    // Checked first so shutdown is prompt; a message already
                    // being handled below still runs to completion.
                    biased;
                    _ = cancel.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Some(msg) => handler.handle_message(msg).await,
                        None => break,
                    },
                }
            }
            debug!(%user, "worker stopped");
        });
        tx
    }
}

impl<H> std::fmt::Debug for Dispatcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.mailboxes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Records processed messages in completion order.
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }

        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl MessageHandler for Recorder {
        async fn handle_message(&self, msg: InboundMessage) {
            // A suspension point, so interleaving would show up if messages
            // for one user were ever handled concurrently.
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.seen
                .lock()
                .unwrap()
                .push((msg.user.0.clone(), msg.text.clone()));
        }
    }

    async fn wait_for(check: impl Fn() -> bool) {
        while !check() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_user_messages_processed_in_order() {
        let handler = Arc::new(Recorder::new());
        let dispatcher = Dispatcher::new(Arc::clone(&handler), CancellationToken::new());

        for i in 0..10 {
            dispatcher
                .dispatch(InboundMessage::text(UserId::new("u1"), format!("m{i}")))
                .await;
        }
        wait_for(|| handler.count() == 10).await;

        let seen = handler.seen.lock().unwrap();
        let texts: Vec<&str> = seen.iter().map(|(_, t)| t.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
        assert_eq!(texts, expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(dispatcher.worker_count(), 1);
    }

    /// Handler where user "a" blocks until a message from "b" has been
    /// seen. Completes only if the two users' workers run in parallel.
    struct CrossUserGate {
        b_seen: Notify,
        done: Mutex<Vec<String>>,
    }

    impl MessageHandler for CrossUserGate {
        async fn handle_message(&self, msg: InboundMessage) {
            if msg.user.as_str() == "a" {
                self.b_seen.notified().await;
            } else {
                self.b_seen.notify_one();
            }
            self.done.lock().unwrap().push(msg.user.0.clone());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_users_run_in_parallel() {
        let handler = Arc::new(CrossUserGate {
            b_seen: Notify::new(),
            done: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(Arc::clone(&handler), CancellationToken::new());

        dispatcher
            .dispatch(InboundMessage::text(UserId::new("a"), "first"))
            .await;
        dispatcher
            .dispatch(InboundMessage::text(UserId::new("b"), "second"))
            .await;

        wait_for(|| handler.done.lock().unwrap().len() == 2).await;
        assert_eq!(dispatcher.worker_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_workers() {
        let handler = Arc::new(Recorder::new());
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(Arc::clone(&handler), cancel.clone());

        dispatcher
            .dispatch(InboundMessage::text(UserId::new("u1"), "before"))
            .await;
        wait_for(|| handler.count() == 1).await;

        cancel.cancel();
        dispatcher
            .dispatch(InboundMessage::text(UserId::new("u1"), "after"))
            .await;
        // Give the stopped worker every chance to (wrongly) pick it up.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.count(), 1);
    }
}
