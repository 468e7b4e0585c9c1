//! In-process store: bounded LRU with per-entry expiry.

use std::{
    num::NonZeroUsize,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use lru::LruCache;

use crate::application::kv::{KvError, KvStore};

use super::lock::mutex_lock;

const SOURCE: &str = "infra::kv::memory";

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = mutex_lock(&self.now, SOURCE, "manual_clock.advance");
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *mutex_lock(&self.now, SOURCE, "manual_clock.now")
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

pub struct MemoryKvStore<C: Clock = SystemClock> {
    entries: Mutex<LruCache<String, Entry>>,
    clock: C,
}

impl MemoryKvStore<SystemClock> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_clock(capacity, SystemClock)
    }
}

impl<C: Clock> MemoryKvStore<C> {
    pub fn with_clock(capacity: NonZeroUsize, clock: C) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<C: Clock> KvStore for MemoryKvStore<C> {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = self.clock.now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        let expires_at = self
            .clock
            .now()
            .checked_add(ttl)
            .ok_or_else(|| KvError::Command(format!("ttl {ttl:?} overflows the clock")))?;
        let entry = Entry { value, expires_at };
        mutex_lock(&self.entries, SOURCE, "put").put(key.to_string(), entry);
        Ok(())
    }
}
