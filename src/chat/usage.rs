//! In-memory usage tracking with a daily reset boundary.
//!
//! Counters are per user and reset at midnight UTC, mirroring a
//! `daily_message_count` / `daily_reset` pair in a user profile store.
//! Anonymous callers get a lower allowance than authenticated ones.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::debug;

use super::UsageTracker;
use crate::config::UsageConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
struct DailyCounter {
    day: NaiveDate,
    count: u32,
}

pub struct DailyUsageTracker {
    config: UsageConfig,
    counters: Mutex<HashMap<String, DailyCounter>>,
}

impl DailyUsageTracker {
    pub fn new(config: UsageConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn current_count(&self, user_id: &str) -> u32 {
        let today = Utc::now().date_naive();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let counter = counters
            .entry(user_id.to_string())
            .or_insert(DailyCounter {
                day: today,
                count: 0,
            });
        if counter.day != today {
            counter.day = today;
            counter.count = 0;
        }
        counter.count
    }
}

#[async_trait]
impl UsageTracker for DailyUsageTracker {
    async fn check_and_reserve(
        &self,
        user_id: &str,
        model: &str,
        authenticated: bool,
    ) -> Result<bool> {
        let limit = if authenticated {
            self.config.daily_limit
        } else {
            self.config.daily_limit_anonymous
        };

        let count = self.current_count(user_id);
        let allowed = count < limit;
        debug!(
            "Usage check for {} on {}: {}/{} ({})",
            user_id,
            model,
            count,
            limit,
            if allowed { "allowed" } else { "denied" }
        );
        Ok(allowed)
    }

    async fn increment(&self, user_id: &str) -> Result<()> {
        let today = Utc::now().date_naive();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let counter = counters
            .entry(user_id.to_string())
            .or_insert(DailyCounter {
                day: today,
                count: 0,
            });
        if counter.day != today {
            counter.day = today;
            counter.count = 0;
        }
        counter.count += 1;
        Ok(())
    }
}
