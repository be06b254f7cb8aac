//! Queue worker: an isolated Tokio task that drains actions in order.
//!
//! This is the actor model again: the worker owns the receiving end of an
//! unbounded channel and is the only thing that ever polls an action.
//! Nothing else touches the actions once they are queued, so there is no
//! lock to get wrong.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::QueueError;

/// One unit of queued work plus the channel its result goes back on.
struct QueuedAction<E> {
    action: BoxFuture<'static, Result<(), E>>,
    reply: oneshot::Sender<Result<(), E>>,
}

/// Handle to a running queue worker.
///
/// Cheap to clone; every clone feeds the same worker, so actions pushed
/// from different call sites still run in one global order. The worker
/// stops once every handle is dropped and the backlog is drained.
pub struct ActionQueue<E> {
    sender: mpsc::UnboundedSender<QueuedAction<E>>,
    depth: Arc<AtomicUsize>,
}

impl<E> Clone for ActionQueue<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            depth: Arc::clone(&self.depth),
        }
    }
}

impl<E> ActionQueue<E>
where
    E: From<QueueError> + Send + 'static,
{
    /// Spawns the worker task and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(rx, Arc::clone(&depth)));
        Self { sender: tx, depth }
    }

    /// Queues an action.
    ///
    /// The action does not start until every action pushed before it has
    /// finished. Its result is delivered through the returned [`Pending`];
    /// dropping the `Pending` does not cancel the action.
    pub fn push<F>(&self, action: F) -> Pending<E>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = QueuedAction {
            action: action.boxed(),
            reply: reply_tx,
        };
        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(rejected)) = self.sender.send(queued) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            let _ = rejected.reply.send(Err(QueueError::Closed.into()));
        }
        Pending { reply: reply_rx }
    }

    /// Queues a pure delay with no other effect.
    pub fn wait(&self, duration: Duration) -> Pending<E> {
        self.push(async move {
            tokio::time::sleep(duration).await;
            Ok(())
        })
    }

    /// Number of actions queued or running.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

async fn run_worker<E>(
    mut receiver: mpsc::UnboundedReceiver<QueuedAction<E>>,
    depth: Arc<AtomicUsize>,
) {
    tracing::debug!("action queue started");

    while let Some(QueuedAction { action, reply }) = receiver.recv().await {
        let result = action.await;
        depth.fetch_sub(1, Ordering::SeqCst);
        // The caller may have dropped its Pending; that's fine.
        let _ = reply.send(result);
    }

    tracing::debug!("action queue stopped");
}

/// The eventual result of one queued action.
///
/// Resolves once the action has run. Resolves to `QueueError::Closed`
/// (converted into `E`) if the worker went away first.
pub struct Pending<E> {
    reply: oneshot::Receiver<Result<(), E>>,
}

impl<E: From<QueueError>> Future for Pending<E> {
    type Output = Result<(), E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.reply)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(QueueError::Closed.into())))
    }
}

impl<E> std::fmt::Debug for Pending<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}
