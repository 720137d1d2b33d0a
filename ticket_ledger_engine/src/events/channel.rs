//! Fire-and-forget pub-sub for ledger events.
//!
//! Components publish events (an order was paid, a payment failed) without waiting for anyone to handle them. Each
//! delivery runs the subscribed handler in its own task, so a slow or failing handler (e.g. a mailing list call) never
//! holds up, or fails, a webhook. Handlers only see the event itself, not the ledger.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight handler tasks to finish.
    pub async fn start_handler(self) {
        debug!("📬️ Starting event handler");
        let Self { mut listener, sender, handler } = self;
        // Only producers may keep the channel open
        drop(sender);
        let mut jobs = JoinSet::new();
        loop {
            tokio::select! {
                event = listener.recv() => match event {
                    Some(event) => {
                        trace!("📬️ Dispatching event");
                        let handler = Arc::clone(&handler);
                        jobs.spawn(async move { (handler)(event).await });
                    },
                    None => break,
                },
                // reap finished jobs as we go so that the set does not grow without bound
                Some(done) = jobs.join_next(), if !jobs.is_empty() => log_failure(done),
            }
        }
        debug!("📬️ All producers have gone away. Waiting for {} handler tasks", jobs.len());
        while let Some(done) = jobs.join_next().await {
            log_failure(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_failure(result: Result<(), JoinError>) {
    if let Err(e) = result {
        warn!("📬️ An event handler task failed: {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues `event` for the handler. A closed channel is logged and otherwise ignored.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
