//! Result channel
//!
//! Single-slot rendezvous between any number of producers and one consumer.
//! A delivered result goes straight to the waiting consumer if there is one,
//! otherwise it is queued. Results come out in delivery order, which is
//! completion order, not plan order.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::models::PoolResult;

/// Result channel errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("A consumer is already waiting on the result channel")]
    ConsumerAlreadyWaiting,

    #[error("Result channel closed before a result arrived")]
    Closed,
}

type Callback = Box<dyn FnOnce(PoolResult) + Send>;

enum Waiter {
    Callback(Callback),
    Oneshot(oneshot::Sender<PoolResult>),
}

impl Waiter {
    fn is_abandoned(&self) -> bool {
        matches!(self, Waiter::Oneshot(tx) if tx.is_closed())
    }
}

#[derive(Default)]
struct Slot {
    queue: VecDeque<PoolResult>,
    waiting: Option<Waiter>,
}

impl Slot {
    /// Register a consumer unless a live one is already waiting
    fn register(&mut self, waiter: Waiter) -> Result<(), ChannelError> {
        if self.waiting.as_ref().is_some_and(|w| !w.is_abandoned()) {
            return Err(ChannelError::ConsumerAlreadyWaiting);
        }
        self.waiting = Some(waiter);
        Ok(())
    }
}

/// Shared handle to a result channel
#[derive(Clone, Default)]
pub struct ResultChannel {
    slot: Arc<Mutex<Slot>>,
}

impl ResultChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `result` to the waiting consumer, or queue it
    pub fn deliver(&self, result: PoolResult) {
        self.hand_over(result, false);
    }

    fn hand_over(&self, mut result: PoolResult, mut front: bool) {
        loop {
            let waiter = {
                let mut slot = self.slot.lock();
                match slot.waiting.take() {
                    Some(waiter) => waiter,
                    None => {
                        if front {
                            slot.queue.push_front(result);
                        } else {
                            slot.queue.push_back(result);
                        }
                        return;
                    }
                }
            };

            match waiter {
                Waiter::Callback(callback) => {
                    callback(result);
                    return;
                }
                Waiter::Oneshot(tx) => match tx.send(result) {
                    Ok(()) => return,
                    // consumer went away; the result is still the oldest one
                    Err(returned) => {
                        result = returned;
                        front = true;
                    }
                },
            }
        }
    }

    /// Pass the oldest queued result to `callback`, or register it as the
    /// waiting consumer.
    ///
    /// The callback runs outside the channel lock, so it may call back into
    /// the channel.
    pub fn receive<F>(&self, callback: F) -> Result<(), ChannelError>
    where
        F: FnOnce(PoolResult) + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(result) = slot.queue.pop_front() {
            drop(slot);
            callback(result);
            return Ok(());
        }
        slot.register(Waiter::Callback(Box::new(callback)))
    }

    /// Await the next result
    pub async fn recv(&self) -> Result<PoolResult, ChannelError> {
        let rx = {
            let mut slot = self.slot.lock();
            if let Some(result) = slot.queue.pop_front() {
                return Ok(result);
            }
            let (tx, rx) = oneshot::channel();
            slot.register(Waiter::Oneshot(tx))?;
            rx
        };

        rx.await.map_err(|_| ChannelError::Closed)
    }

    /// Await exactly `count` results
    pub async fn take(&self, count: usize) -> Result<Vec<PoolResult>, ChannelError> {
        let mut results = Vec::with_capacity(count);
        while results.len() < count {
            results.push(self.recv().await?);
        }
        Ok(results)
    }

    /// Number of queued results nobody has received yet
    pub fn queued(&self) -> usize {
        self.slot.lock().queue.len()
    }

    pub fn has_waiting_consumer(&self) -> bool {
        self.slot
            .lock()
            .waiting
            .as_ref()
            .is_some_and(|w| !w.is_abandoned())
    }
}
