// ABOUTME: In-memory sliding-window counter with LRU-bounded key tracking
// ABOUTME: Single-process backend for development and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

use super::{CounterDecision, CounterProvider};
use crate::errors::AppResult;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory sliding-window log counter
///
/// Keeps a timestamp log per key inside an LRU-bounded map so unbounded
/// distinct identifiers cannot exhaust memory. Counts are not shared across
/// processes; multi-instance deployments need the Redis backend.
#[derive(Clone)]
pub struct InMemoryCounter {
    store: Arc<Mutex<LruCache<String, VecDeque<i64>>>>,
}

impl InMemoryCounter {
    /// Default tracked-key capacity when config specifies zero
    /// Note: `unreachable!()` on a compile-time constant is verified at compile time
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a counter tracking at most `max_tracked_keys` distinct keys
    #[must_use]
    pub fn new(max_tracked_keys: usize) -> Self {
        let capacity = NonZeroUsize::new(max_tracked_keys).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Create a counter with the default capacity
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(Self::DEFAULT_CAPACITY.get())
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait::async_trait]
impl CounterProvider for InMemoryCounter {
    async fn consume(&self, key: &str, limit: u32, window: Duration) -> AppResult<CounterDecision> {
        let now = Self::now_ms();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now - window_ms;

        let mut store = self.store.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("in-memory counter lock poisoned, recovering");
            poisoned.into_inner()
        });

        let log = store.get_or_insert_mut(key.to_owned(), VecDeque::new);

        // Drop attempts that slid out of the window
        while log.front().is_some_and(|ts| *ts <= cutoff) {
            log.pop_front();
        }

        log.push_back(now);

        let count = u32::try_from(log.len()).unwrap_or(u32::MAX);
        let oldest = log.front().copied().unwrap_or(now);
        drop(store);

        Ok(CounterDecision {
            allowed: count <= limit,
            remaining: limit.saturating_sub(count),
            reset_epoch_seconds: (oldest + window_ms) / 1000,
        })
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}
