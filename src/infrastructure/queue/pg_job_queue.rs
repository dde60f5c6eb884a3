use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::application::ports::{Acknowledger, Delivery, JobQueue, QueueError, Settlement};
use crate::domain::QueueMessage;

/// Durable queue on a Postgres table.
///
/// A receive claims the oldest visible message with `FOR UPDATE SKIP LOCKED`
/// and hides it for the visibility timeout. While the delivery is held, a
/// heartbeat extends the lease every third of the timeout. A message whose
/// consumer dies without settling becomes visible again once that lease runs
/// out.
pub struct PgJobQueue {
    pool: PgPool,
    queue_name: String,
    poll_interval: Duration,
    visibility_timeout: Duration,
    closed: CancellationToken,
}

#[derive(sqlx::FromRow)]
struct ClaimedRow {
    id: i64,
    body: Vec<u8>,
    delivery_count: i32,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, queue_name: impl Into<String>) -> Self {
        Self {
            pool,
            queue_name: queue_name.into(),
            poll_interval: Duration::from_millis(500),
            visibility_timeout: Duration::from_secs(300),
            closed: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// Makes pending and future `receive` calls return `None`.
    pub fn close(&self) {
        self.closed.cancel();
    }

    async fn claim(&self) -> Result<Option<ClaimedRow>, QueueError> {
        sqlx::query_as::<_, ClaimedRow>(
            r#"
            UPDATE queue_messages
            SET delivery_count = delivery_count + 1,
                visible_at = now() + make_interval(secs => $2)
            WHERE id = (
                SELECT id
                FROM queue_messages
                WHERE queue_name = $1 AND visible_at <= now()
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, body, delivery_count
            "#,
        )
        .bind(&self.queue_name)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QueueError::ReceiveFailed(e.to_string()))
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    #[instrument(skip(self, message), fields(queue = %self.queue_name, job_id = %message.job_id))]
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError> {
        if self.closed.is_cancelled() {
            return Err(QueueError::Closed);
        }

        sqlx::query(
            r#"
            INSERT INTO queue_messages (queue_name, body, delivery_count, visible_at, enqueued_at)
            VALUES ($1, $2, 0, now(), now())
            "#,
        )
        .bind(&self.queue_name)
        .bind(message.encode())
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::PublishFailed(e.to_string()))?;

        debug!("Message published");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        loop {
            if self.closed.is_cancelled() {
                return Ok(None);
            }

            if let Some(row) = self.claim().await? {
                debug!(
                    queue = %self.queue_name,
                    message_id = row.id,
                    delivery_count = row.delivery_count,
                    "Message claimed"
                );
                let lease = CancellationToken::new();
                let heartbeat = tokio::spawn(keep_lease_alive(
                    self.pool.clone(),
                    row.id,
                    row.delivery_count,
                    self.visibility_timeout,
                    lease.clone(),
                ));
                let acknowledger = PgAcknowledger {
                    pool: self.pool.clone(),
                    queue_name: self.queue_name.clone(),
                    message_id: row.id,
                    lease,
                    heartbeat: Mutex::new(Some(heartbeat)),
                };
                return Ok(Some(Delivery::new(
                    row.body,
                    u32::try_from(row.delivery_count).unwrap_or(1),
                    Box::new(acknowledger),
                )));
            }

            tokio::select! {
                _ = self.closed.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Pushes `visible_at` forward until `lease` is cancelled. The
/// `delivery_count` guard keeps a stale heartbeat off a later claim.
async fn keep_lease_alive(
    pool: PgPool,
    message_id: i64,
    delivery_count: i32,
    visibility_timeout: Duration,
    lease: CancellationToken,
) {
    let period = (visibility_timeout / 3).max(Duration::from_millis(10));

    loop {
        tokio::select! {
            _ = lease.cancelled() => return,
            _ = tokio::time::sleep(period) => {}
        }

        let extended = sqlx::query(
            r#"
            UPDATE queue_messages
            SET visible_at = now() + make_interval(secs => $2)
            WHERE id = $1 AND delivery_count = $3
            "#,
        )
        .bind(message_id)
        .bind(visibility_timeout.as_secs_f64())
        .bind(delivery_count)
        .execute(&pool)
        .await;

        match extended {
            Ok(result) if result.rows_affected() == 0 => {
                warn!(message_id, "Lease lost, message no longer held by this delivery");
                return;
            }
            Ok(_) => debug!(message_id, "Lease extended"),
            Err(e) => warn!(message_id, error = %e, "Failed to extend lease"),
        }
    }
}

struct PgAcknowledger {
    pool: PgPool,
    queue_name: String,
    message_id: i64,
    lease: CancellationToken,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl PgAcknowledger {
    /// Stops the heartbeat and waits out any in-flight extension so it
    /// cannot land after a requeue.
    async fn release_lease(&self) {
        self.lease.cancel();
        let heartbeat = self
            .heartbeat
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(heartbeat) = heartbeat {
            let _ = heartbeat.await;
        }
    }
}

impl Drop for PgAcknowledger {
    fn drop(&mut self) {
        self.lease.cancel();
    }
}

#[async_trait]
impl Acknowledger for PgAcknowledger {
    #[instrument(skip(self), fields(queue = %self.queue_name, message_id = self.message_id))]
    async fn settle(&self, settlement: Settlement) -> Result<(), QueueError> {
        let map_err = |e: sqlx::Error| QueueError::SettleFailed(e.to_string());
        self.release_lease().await;

        match settlement {
            Settlement::Ack => {
                sqlx::query("DELETE FROM queue_messages WHERE id = $1")
                    .bind(self.message_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_err)?;
            }
            Settlement::Requeue => {
                sqlx::query("UPDATE queue_messages SET visible_at = now() WHERE id = $1")
                    .bind(self.message_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_err)?;
            }
            Settlement::DeadLetter(reason) => {
                let mut tx = self.pool.begin().await.map_err(map_err)?;
                let moved = sqlx::query(
                    r#"
                    WITH removed AS (
                        DELETE FROM queue_messages WHERE id = $1
                        RETURNING queue_name, body, delivery_count
                    )
                    INSERT INTO queue_dead_letters (queue_name, body, delivery_count, reason, dead_lettered_at)
                    SELECT queue_name, body, delivery_count, $2, now() FROM removed
                    "#,
                )
                .bind(self.message_id)
                .bind(&reason)
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
                tx.commit().await.map_err(map_err)?;

                if moved.rows_affected() == 0 {
                    warn!("Message vanished before it could be dead-lettered");
                }
            }
        }

        Ok(())
    }
}
