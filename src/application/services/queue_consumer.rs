use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::JobQueue;

use super::StreamProcessor;

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// One consumer slot: holds at most one unsettled delivery at a time.
pub struct QueueConsumer {
    slot: usize,
    queue: Arc<dyn JobQueue>,
    processor: Arc<StreamProcessor>,
}

impl QueueConsumer {
    pub fn new(slot: usize, queue: Arc<dyn JobQueue>, processor: Arc<StreamProcessor>) -> Self {
        Self {
            slot,
            queue,
            processor,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(slot = self.slot, "Queue consumer started");

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.receive() => received,
            };

            match received {
                Ok(Some(delivery)) => {
                    let report = self.processor.handle(delivery).await;
                    tracing::debug!(
                        slot = self.slot,
                        job_id = ?report.job_id,
                        outcome = ?report.outcome,
                        settlement = report.settlement.as_str(),
                        settled = report.settled,
                        "Delivery handled"
                    );
                }
                Ok(None) => {
                    tracing::info!(slot = self.slot, "Queue closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(slot = self.slot, error = %e, "Failed to receive from queue");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        tracing::info!(slot = self.slot, "Queue consumer stopped");
    }
}

/// Starts `consumers` slots sharing one queue and one processor.
pub fn spawn_consumers(
    consumers: usize,
    queue: Arc<dyn JobQueue>,
    processor: Arc<StreamProcessor>,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    (0..consumers.max(1))
        .map(|slot| {
            let consumer = QueueConsumer::new(slot, Arc::clone(&queue), Arc::clone(&processor));
            tokio::spawn(consumer.run(shutdown.clone()))
        })
        .collect()
}
