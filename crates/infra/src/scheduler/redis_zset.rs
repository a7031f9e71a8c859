//! Redis-backed continuation scheduler.
//!
//! Pending messages live in a sorted set scored by `resumeAt` (epoch millis).
//! Claiming moves a message into a second sorted set scored by lease expiry;
//! the move is a single script, so exactly one pump wins each message.
//! Settling removes the leased member. Members left in the lease set past
//! their expiry are moved back to pending on the next claim.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, warn};

use docflow_jobs::ContinuationMessage;

use super::{ContinuationScheduler, Lease};
use crate::error::InfraError;

const DEFAULT_KEY: &str = "docflow:continuations";

/// Remove ARGV[1] from KEYS[1]; only if it was there, add ARGV[2] to KEYS[2]
/// with score ARGV[3].
const MOVE_MEMBER: &str = r#"
if redis.call('ZREM', KEYS[1], ARGV[1]) == 1 then
    redis.call('ZADD', KEYS[2], ARGV[3], ARGV[2])
    return 1
end
return 0
"#;

#[derive(Debug, Clone)]
pub struct RedisContinuationScheduler {
    client: Arc<redis::Client>,
    key: String,
    leased_key: String,
}

impl RedisContinuationScheduler {
    pub fn new(redis_url: impl AsRef<str>, key: Option<String>) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| InfraError::Scheduler(format!("redis connection: {e}")))?;
        let key = key.unwrap_or_else(|| DEFAULT_KEY.to_string());

        Ok(Self {
            client: Arc::new(client),
            leased_key: format!("{key}:leased"),
            key,
        })
    }

    fn connection(&self) -> Result<redis::Connection, InfraError> {
        self.client
            .get_connection()
            .map_err(|e| InfraError::Scheduler(format!("redis connection: {e}")))
    }

    fn move_member(
        &self,
        conn: &mut redis::Connection,
        from: &str,
        to: &str,
        removed: &str,
        added: &str,
        score: i64,
    ) -> Result<bool, InfraError> {
        let moved: i64 = redis::Script::new(MOVE_MEMBER)
            .key(from)
            .key(to)
            .arg(removed)
            .arg(added)
            .arg(score)
            .invoke(conn)
            .map_err(|e| InfraError::Scheduler(format!("move continuation: {e}")))?;
        Ok(moved == 1)
    }

    fn range_until(
        &self,
        conn: &mut redis::Connection,
        key: &str,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<String>, InfraError> {
        redis::cmd("ZRANGEBYSCORE")
            .arg(key)
            .arg("-inf")
            .arg(until.timestamp_millis())
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query(conn)
            .map_err(|e| InfraError::Scheduler(format!("ZRANGEBYSCORE: {e}")))
    }

    /// Move expired leases back to pending, due immediately.
    fn reclaim_expired(
        &self,
        conn: &mut redis::Connection,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<(), InfraError> {
        for body in self.range_until(conn, &self.leased_key, now, limit)? {
            let due_now = now.timestamp_millis();
            if self.move_member(conn, &self.leased_key, &self.key, &body, &body, due_now)? {
                warn!(key = %self.key, "continuation lease expired; reclaimed");
            }
        }
        Ok(())
    }
}

impl ContinuationScheduler for RedisContinuationScheduler {
    #[instrument(
        skip(self, message),
        fields(
            key = %self.key,
            document_upload_id = %message.document_upload_id(),
            resume_at = %message.resume_at,
        )
    )]
    fn schedule(&self, message: &ContinuationMessage) -> Result<(), InfraError> {
        let body = serde_json::to_string(message)?;
        let mut conn = self.connection()?;

        let _: i64 = redis::cmd("ZADD")
            .arg(&self.key)
            .arg(message.resume_at.timestamp_millis())
            .arg(body)
            .query(&mut conn)
            .map_err(|e| InfraError::Scheduler(format!("ZADD: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self), fields(key = %self.key))]
    fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        lease_for: Duration,
    ) -> Result<Vec<Lease>, InfraError> {
        let mut conn = self.connection()?;
        self.reclaim_expired(&mut conn, now, limit)?;

        let expires_at = (now + lease_for).timestamp_millis();
        let mut leases = Vec::new();
        for body in self.range_until(&mut conn, &self.key, now, limit)? {
            if !self.move_member(&mut conn, &self.key, &self.leased_key, &body, &body, expires_at)? {
                debug!("continuation claimed by another pump");
                continue;
            }

            match serde_json::from_str::<ContinuationMessage>(&body) {
                Ok(message) => leases.push(Lease {
                    message,
                    token: body,
                }),
                Err(e) => {
                    warn!(error = %e, body = %body, "discarding malformed continuation");
                    let _: i64 = redis::cmd("ZREM")
                        .arg(&self.leased_key)
                        .arg(&body)
                        .query(&mut conn)
                        .map_err(|e| InfraError::Scheduler(format!("ZREM: {e}")))?;
                }
            }
        }

        Ok(leases)
    }

    #[instrument(skip(self, lease), fields(key = %self.key))]
    fn complete(&self, lease: &Lease) -> Result<(), InfraError> {
        let mut conn = self.connection()?;
        let _: i64 = redis::cmd("ZREM")
            .arg(&self.leased_key)
            .arg(lease.token())
            .query(&mut conn)
            .map_err(|e| InfraError::Scheduler(format!("ZREM: {e}")))?;
        Ok(())
    }

    #[instrument(
        skip(self, lease, message),
        fields(key = %self.key, resume_at = %message.resume_at)
    )]
    fn retry_later(&self, lease: &Lease, message: &ContinuationMessage) -> Result<(), InfraError> {
        let body = serde_json::to_string(message)?;
        let mut conn = self.connection()?;

        let replaced = self.move_member(
            &mut conn,
            &self.leased_key,
            &self.key,
            lease.token(),
            &body,
            message.resume_at.timestamp_millis(),
        )?;
        if !replaced {
            debug!("lease already expired; message was reclaimed");
        }
        Ok(())
    }
}
