//! Tokio channel-based transport for single-process mode
//!
//! Each subscriber owns an unbounded mpsc queue, so a slow subscriber never
//! loses change sets (a broadcast channel would drop lagged messages).
//! No serialization overhead - messages are passed directly.

use crate::error::TransportError;
use crate::transport::{Publisher, Subscriber};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel-based publisher fanning out to every subscriber
pub struct ChannelPublisher<M> {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<M>>>>,
}

impl<M> Clone for ChannelPublisher<M> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<M: Clone> Default for ChannelPublisher<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone> ChannelPublisher<M> {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a publisher/subscriber pair
    pub fn pair() -> (Self, ChannelSubscriber<M>) {
        let publisher = Self::new();
        let subscriber = publisher.subscribe();
        (publisher, subscriber)
    }

    /// Get another subscriber for this publisher
    pub fn subscribe(&self) -> ChannelSubscriber<M> {
        self.subscribe_with(std::iter::empty())
    }

    /// Subscribe with messages delivered ahead of anything published later.
    ///
    /// Registration and queuing of `initial` happen under the publisher lock,
    /// so no concurrent `send` can slip in between.
    pub fn subscribe_with(&self, initial: impl IntoIterator<Item = M>) -> ChannelSubscriber<M> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();
        for msg in initial {
            // Receiver is alive in this scope
            let _ = tx.send(msg);
        }
        subscribers.push(tx);
        ChannelSubscriber { rx }
    }

    /// Deliver a message to every live subscriber, pruning closed ones.
    ///
    /// Returns the number of subscribers reached.
    pub fn send(&self, msg: &M) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(msg.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl<M> Publisher<M> for ChannelPublisher<M>
where
    M: Serialize + Clone + Send + Sync + 'static,
{
    /// Publishing with no subscribers is not an error
    async fn publish(&self, msg: &M) -> Result<(), TransportError> {
        self.send(msg);
        Ok(())
    }
}

/// Channel-based subscriber
pub struct ChannelSubscriber<M> {
    rx: mpsc::UnboundedReceiver<M>,
}

#[async_trait]
impl<M> Subscriber<M> for ChannelSubscriber<M>
where
    M: DeserializeOwned + Send + 'static,
{
    async fn next(&mut self) -> Result<M, TransportError> {
        self.rx.recv().await.ok_or(TransportError::ChannelClosed)
    }

    fn try_next(&mut self) -> Result<Option<M>, TransportError> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(TransportError::ChannelClosed),
        }
    }
}
