//! A typed, narrow client over the primitive key-value/list operations the
//! task queue and state manager need: `get`, `set` (with optional TTL),
//! `rpush`, `brpop`, `lrem`, `llen`, `lrange`, `scan`, `exists`, `setex`,
//! `keys`.
//!
//! Deliberately thin: the Task Queue and State Manager are built on top of
//! this client and carry all task/state-specific semantics themselves.

use redis::AsyncCommands;

use crate::error::KvResult;

#[derive(Debug, Clone)]
pub struct KvConfig {
    pub redis_url: String,
}

impl KvConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        }
    }
}

impl Default for KvConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Clone)]
pub struct KvStore {
    client: redis::Client,
}

impl KvStore {
    pub fn new(config: &KvConfig) -> KvResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client })
    }

    pub fn from_env() -> KvResult<Self> {
        Self::new(&KvConfig::from_env())
    }

    pub async fn ping(&self) -> KvResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    pub async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    pub async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> KvResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> KvResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.expire(key, ttl_secs).await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> KvResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.del(key).await?)
    }

    pub async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: i64 = conn.exists(key).await?;
        Ok(count > 0)
    }

    pub async fn rpush(&self, key: &str, value: &str) -> KvResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.rpush(key, value).await?)
    }

    /// Blocking pop from the head of the list with a timeout in seconds.
    /// Returns `None` when the timeout elapses with nothing popped.
    pub async fn brpop(&self, key: &str, timeout_secs: f64) -> KvResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<(String, String)> = conn.brpop(key, timeout_secs).await?;
        Ok(result.map(|(_, value)| value))
    }

    pub async fn lrem(&self, key: &str, count: isize, value: &str) -> KvResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.lrem(key, count, value).await?)
    }

    pub async fn llen(&self, key: &str) -> KvResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.llen(key).await?)
    }

    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> KvResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.lrange(key, start, stop).await?)
    }

    /// Cursor-based `SCAN` over keys matching `pattern`. Never uses `KEYS` on
    /// hot paths: enumeration must iterate by cursor, not block on a full
    /// keyspace walk.
    pub async fn scan_keys(&self, pattern: &str, page_size: usize) -> KvResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(page_size)
                .query_async(&mut conn)
                .await?;
            found.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(found)
    }

    /// Unbounded `KEYS`, reserved for diagnostics (CLI, tests) where the
    /// result set is expected to be small. Never call this on a worker hot path.
    pub async fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.keys(pattern).await?)
    }

    /// Run a Lua script against the store. Used by callers that need
    /// atomicity `KvStore`'s per-command methods can't express on their own,
    /// e.g. compare-and-set on a versioned document.
    pub async fn eval_script<T: redis::FromRedisValue>(
        &self,
        script: &redis::Script,
        keys: &[&str],
        args: &[&str],
    ) -> KvResult<T> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(*arg);
        }
        Ok(invocation.invoke_async(&mut conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_env_defaults_to_localhost() {
        std::env::remove_var("REDIS_URL");
        let config = KvConfig::from_env();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    }
}
