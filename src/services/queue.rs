use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::TaskRecord;

const QUEUE_KEY: &str = "lecture_notes:tasks";
const PROCESSING_KEY: &str = "lecture_notes:processing";
const DEADLINES_KEY: &str = "lecture_notes:processing:deadlines";
const PAYLOADS_KEY: &str = "lecture_notes:processing:payloads";
const DEAD_LETTER_KEY: &str = "lecture_notes:dead_letter";

/// Queue payload driving one pipeline invocation. Carries the full task
/// inputs so the worker can process without a record read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub task_id: Uuid,
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub description: String,
}

impl From<&TaskRecord> for WorkItem {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            title: record.title.clone(),
            video_url: record.video_url.clone(),
            description: record.description.clone(),
        }
    }
}

/// One received work item, held invisible to other consumers until the
/// visibility window lapses or the receipt is acknowledged.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub item: WorkItem,
    /// Opaque handle passed back to [`WorkQueue::ack`].
    pub receipt: String,
    /// How many times this item has been delivered, this one included.
    pub receive_count: u32,
}

/// Durable at-least-once work queue.
///
/// An unacknowledged delivery becomes visible again after its timeout and
/// is redelivered, so consumers must be safe to re-run against the same
/// task id. Items delivered too many times are dead-lettered by the queue
/// itself; the pipeline never sees that policy.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError>;

    /// Receive at most one item, hiding it from other consumers for
    /// `visibility`. Returns `None` when the queue is empty.
    async fn receive(&self, visibility: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledge a delivery (delete-on-success). Unknown or expired
    /// receipts are a no-op.
    async fn ack(&self, receipt: &str) -> Result<(), QueueError>;

    /// Number of items waiting to be received.
    async fn depth(&self) -> Result<u64, QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;
}

/// On-the-wire wrapper around a [`WorkItem`]. `receive_count` is the number
/// of completed deliveries; it only grows when a delivery times out and the
/// item is requeued.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    message_id: Uuid,
    receive_count: u32,
    item: WorkItem,
}

/// Redis-backed work queue with visibility timeouts and a
/// maximum-receive-count dead-letter policy.
///
/// Layout: pending items in a list; a received item moves to an in-flight
/// list while its receipt is parked in a hash with its deadline in a
/// sorted set. `receive` first requeues every in-flight item whose
/// deadline lapsed, so redelivery needs no background process. The move
/// between lists is atomic; the receipt bookkeeping after it is not. A
/// consumer that dies inside that window strands its item in the
/// in-flight list (never silently dropped, but only an operator can
/// requeue it).
pub struct RedisQueue {
    client: redis::Client,
    max_receives: u32,
}

impl RedisQueue {
    pub fn new(redis_url: &str, max_receives: u32) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self {
            client,
            max_receives,
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    /// Move every in-flight item whose visibility deadline has lapsed back
    /// to the pending list, bumping its receive count.
    async fn reclaim_expired(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
    ) -> Result<(), QueueError> {
        let now = Utc::now().timestamp_millis();
        let expired: Vec<String> = conn
            .zrangebyscore(DEADLINES_KEY, "-inf", now)
            .await
            .map_err(QueueError::Redis)?;

        for receipt in expired {
            let payload: Option<String> = conn
                .hget(PAYLOADS_KEY, &receipt)
                .await
                .map_err(QueueError::Redis)?;

            if let Some(payload) = payload {
                conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
                    .await
                    .map_err(QueueError::Redis)?;

                match serde_json::from_str::<Envelope>(&payload) {
                    Ok(mut envelope) => {
                        envelope.receive_count += 1;
                        tracing::info!(
                            task_id = %envelope.item.task_id,
                            receive_count = envelope.receive_count,
                            "Visibility timeout lapsed, requeueing work item"
                        );
                        let requeued =
                            serde_json::to_string(&envelope).map_err(QueueError::Serialize)?;
                        conn.lpush::<_, _, ()>(QUEUE_KEY, &requeued)
                            .await
                            .map_err(QueueError::Redis)?;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Unparsable in-flight payload, dead-lettering");
                        conn.lpush::<_, _, ()>(DEAD_LETTER_KEY, &payload)
                            .await
                            .map_err(QueueError::Redis)?;
                    }
                }
            }

            conn.hdel::<_, _, ()>(PAYLOADS_KEY, &receipt)
                .await
                .map_err(QueueError::Redis)?;
            conn.zrem::<_, _, ()>(DEADLINES_KEY, &receipt)
                .await
                .map_err(QueueError::Redis)?;
        }
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let envelope = Envelope {
            message_id: Uuid::new_v4(),
            receive_count: 0,
            item: item.clone(),
        };
        let payload = serde_json::to_string(&envelope).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn receive(&self, visibility: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.connection().await?;
        self.reclaim_expired(&mut conn).await?;

        loop {
            let payload: Option<String> = conn
                .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
                .await
                .map_err(QueueError::Redis)?;

            let Some(payload) = payload else {
                return Ok(None);
            };

            let envelope: Envelope = match serde_json::from_str(&payload) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::error!(error = %e, "Unparsable queue payload, dead-lettering");
                    conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
                        .await
                        .map_err(QueueError::Redis)?;
                    conn.lpush::<_, _, ()>(DEAD_LETTER_KEY, &payload)
                        .await
                        .map_err(QueueError::Redis)?;
                    continue;
                }
            };

            if envelope.receive_count >= self.max_receives {
                tracing::warn!(
                    task_id = %envelope.item.task_id,
                    receive_count = envelope.receive_count,
                    "Max receives reached, dead-lettering work item"
                );
                conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
                    .await
                    .map_err(QueueError::Redis)?;
                conn.lpush::<_, _, ()>(DEAD_LETTER_KEY, &payload)
                    .await
                    .map_err(QueueError::Redis)?;
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            let deadline = Utc::now().timestamp_millis() + visibility.as_millis() as i64;
            conn.hset::<_, _, _, ()>(PAYLOADS_KEY, &receipt, &payload)
                .await
                .map_err(QueueError::Redis)?;
            conn.zadd::<_, _, _, ()>(DEADLINES_KEY, &receipt, deadline)
                .await
                .map_err(QueueError::Redis)?;

            return Ok(Some(Delivery {
                item: envelope.item,
                receipt,
                receive_count: envelope.receive_count + 1,
            }));
        }
    }

    async fn ack(&self, receipt: &str) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .hget(PAYLOADS_KEY, receipt)
            .await
            .map_err(QueueError::Redis)?;

        if let Some(payload) = payload {
            conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
                .await
                .map_err(QueueError::Redis)?;
        }

        conn.hdel::<_, _, ()>(PAYLOADS_KEY, receipt)
            .await
            .map_err(QueueError::Redis)?;
        conn.zrem::<_, _, ()>(DEADLINES_KEY, receipt)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
