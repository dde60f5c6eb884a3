use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::application::ports::{Acknowledger, Delivery, JobQueue, QueueError, Settlement};
use crate::domain::QueueMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledMessage {
    pub body: Vec<u8>,
    pub delivery_count: u32,
    pub settlement: Settlement,
}

const DEFAULT_SETTLED_CAPACITY: usize = 1000;

struct State {
    ready: VecDeque<(Vec<u8>, u32)>,
    settled: VecDeque<SettledMessage>,
    settled_capacity: usize,
    in_flight: usize,
    closed: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ready: VecDeque::new(),
            settled: VecDeque::new(),
            settled_capacity: DEFAULT_SETTLED_CAPACITY,
            in_flight: 0,
            closed: false,
        }
    }
}

impl State {
    fn record_settled(&mut self, message: SettledMessage) {
        if self.settled_capacity == 0 {
            return;
        }
        while self.settled.len() >= self.settled_capacity {
            self.settled.pop_front();
        }
        self.settled.push_back(message);
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-process queue with the same settlement semantics as the durable
/// one. A requeued message goes to the back with its delivery count kept.
#[derive(Clone, Default)]
pub struct InMemoryJobQueue {
    shared: Arc<Shared>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the most recent `capacity` settlements for inspection.
    /// Zero disables the log.
    pub fn with_settled_capacity(self, capacity: usize) -> Self {
        {
            let mut state = self.shared.lock();
            state.settled_capacity = capacity;
            while state.settled.len() > capacity {
                state.settled.pop_front();
            }
        }
        self
    }

    /// Publishes a raw body, bypassing message encoding.
    pub fn push_raw(&self, body: Vec<u8>) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        state.ready.push_back((body, 0));
        drop(state);
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Pending `receive` calls return `None` once the backlog is drained.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.notify.notify_waiters();
    }

    pub fn ready_len(&self) -> usize {
        self.shared.lock().ready.len()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    pub fn settled(&self) -> Vec<SettledMessage> {
        self.shared.lock().settled.iter().cloned().collect()
    }

    pub fn dead_letters(&self) -> Vec<SettledMessage> {
        self.shared
            .lock()
            .settled
            .iter()
            .filter(|m| matches!(m.settlement, Settlement::DeadLetter(_)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError> {
        self.push_raw(message.encode())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.lock();
                if let Some((body, count)) = state.ready.pop_front() {
                    state.in_flight += 1;
                    let delivery_count = count + 1;
                    let acknowledger = InMemoryAcknowledger {
                        shared: Arc::clone(&self.shared),
                        body: body.clone(),
                        delivery_count,
                    };
                    return Ok(Some(Delivery::new(
                        body,
                        delivery_count,
                        Box::new(acknowledger),
                    )));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }
}

struct InMemoryAcknowledger {
    shared: Arc<Shared>,
    body: Vec<u8>,
    delivery_count: u32,
}

#[async_trait]
impl Acknowledger for InMemoryAcknowledger {
    async fn settle(&self, settlement: Settlement) -> Result<(), QueueError> {
        let mut state = self.shared.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        let requeue = settlement == Settlement::Requeue;
        state.record_settled(SettledMessage {
            body: self.body.clone(),
            delivery_count: self.delivery_count,
            settlement,
        });
        if requeue {
            state.ready.push_back((self.body.clone(), self.delivery_count));
            drop(state);
            self.shared.notify.notify_one();
        }
        Ok(())
    }
}
