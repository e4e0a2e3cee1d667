use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "amor:songs";
const PROCESSING_KEY: &str = "amor:songs:processing";

/// Job payload serialized into Redis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedSong {
    pub job_id: Uuid,
}

/// Redis-backed hand-off of new song jobs from the API to the worker.
pub struct JobQueue {
    client: redis::Client,
}

impl JobQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Enqueue a song job.
    pub async fn enqueue(&self, job: &QueuedSong) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;
        Ok(())
    }

    /// Take the oldest job, moving it to the processing list.
    pub async fn dequeue(&self) -> Result<Option<QueuedSong>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<String> = conn.rpoplpush(QUEUE_KEY, PROCESSING_KEY).await?;

        match result {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Get the current queue depth (pending jobs).
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }

    /// Remove a job from the processing list once its pipeline is spawned.
    pub async fn complete(&self, job: &QueuedSong) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;
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
