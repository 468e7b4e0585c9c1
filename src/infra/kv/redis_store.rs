//! Redis-backed store shared across server instances.

use std::time::Duration;

use async_trait::async_trait;
use redis::{RedisError, aio::ConnectionManager};

use crate::application::kv::{KvError, KvStore};

#[derive(Clone)]
pub struct RedisKvStore {
    connection: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut connection = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut connection)
            .await
            .map_err(map_redis_error)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        // EX takes whole seconds; round up so short TTLs never become zero.
        let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        let mut connection = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds.max(1))
            .query_async::<_, ()>(&mut connection)
            .await
            .map_err(map_redis_error)
    }
}

fn map_redis_error(err: RedisError) -> KvError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
        KvError::Unavailable(err.to_string())
    } else {
        KvError::Command(err.to_string())
    }
}
