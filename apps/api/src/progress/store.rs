//! Where batch runs publish their progress so that pollers can read it.
//!
//! `AppState` holds an `Arc<dyn ProgressStore>`: Redis when `REDIS_URL` is set,
//! process memory otherwise.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::progress::BatchRun;

/// Matches the `PROGRESS_TTL_SECS` default.
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ProgressStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn save(&self, run: &BatchRun) -> Result<(), ProgressStoreError>;
    async fn load(&self, id: Uuid) -> Result<Option<BatchRun>, ProgressStoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store. Each run expires `ttl` after its last save, like the
/// Redis backend; expired entries are pruned on every access.
pub struct InMemoryProgressStore {
    ttl: Duration,
    runs: RwLock<HashMap<Uuid, (Instant, BatchRun)>>,
}

impl InMemoryProgressStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            runs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn save(&self, run: &BatchRun) -> Result<(), ProgressStoreError> {
        let now = Instant::now();
        let mut runs = self.runs.write().await;
        runs.retain(|_, (expires_at, _)| *expires_at > now);
        runs.insert(run.id, (now + self.ttl, run.clone()));
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<BatchRun>, ProgressStoreError> {
        let now = Instant::now();
        let mut runs = self.runs.write().await;
        runs.retain(|_, (expires_at, _)| *expires_at > now);
        Ok(runs.get(&id).map(|(_, run)| run.clone()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

/// Stores each run as a JSON string under `batch_run:<id>` with a TTL, so finished
/// runs expire on their own.
pub struct RedisProgressStore {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisProgressStore {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }

    fn key(id: Uuid) -> String {
        format!("batch_run:{id}")
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn save(&self, run: &BatchRun) -> Result<(), ProgressStoreError> {
        let payload = serde_json::to_string(run)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(Self::key(run.id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<BatchRun>, ProgressStoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::key(id))
            .query_async(&mut conn)
            .await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
