use crate::config::settings::RateLimitSettings;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_TRACKED_CLIENTS: usize = 10_000;
/// 兩次清理之間的最短間隔，避免表滿時每個新用戶端都整表掃描
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// 每個用戶端一個 token bucket
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    buckets: HashMap<String, Bucket>,
    last_sweep: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u64, burst: u64) -> Self {
        Self {
            capacity: burst.max(1) as f64,
            refill_per_sec: requests_per_minute.max(1) as f64 / 60.0,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// 設定中停用時回傳 `None`
    pub fn from_settings(settings: &RateLimitSettings) -> Option<Self> {
        settings
            .enabled
            .then(|| Self::new(settings.requests_per_minute, settings.burst))
    }

    /// 取得一個 token；不足時回傳需要等待的時間
    pub fn try_acquire(&self, client: &str) -> Result<(), Duration> {
        self.try_acquire_at(client, Instant::now())
    }

    fn try_acquire_at(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.buckets.len() >= MAX_TRACKED_CLIENTS
            && !state.buckets.contains_key(client)
            && state
                .last_sweep
                .map_or(true, |last| now.saturating_duration_since(last) >= SWEEP_INTERVAL)
        {
            self.evict_idle(&mut state.buckets, now);
            state.last_sweep = Some(now);
        }

        let bucket = state.buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_per_sec))
        }
    }

    /// 移除已補滿的 bucket（等同從未請求過）
    fn evict_idle(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        buckets.retain(|_, b| {
            let elapsed = now.saturating_duration_since(b.last_refill).as_secs_f64();
            b.tokens + elapsed * self.refill_per_sec < self.capacity
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::new(60, 2);
        let now = Instant::now();
        assert!(limiter.try_acquire_at("10.0.0.1", now).is_ok());
        assert!(limiter.try_acquire_at("10.0.0.1", now).is_ok());

        let wait = limiter.try_acquire_at("10.0.0.1", now).unwrap_err();
        assert!(wait <= Duration::from_secs(1));

        // 其他用戶端不受影響
        assert!(limiter.try_acquire_at("10.0.0.2", now).is_ok());
    }

    #[test]
    fn test_refills_over_time() {
        let limiter = RateLimiter::new(60, 1);
        let now = Instant::now();
        assert!(limiter.try_acquire_at("client", now).is_ok());
        assert!(limiter.try_acquire_at("client", now).is_err());
        assert!(limiter
            .try_acquire_at("client", now + Duration::from_secs(1))
            .is_ok());
    }

    #[test]
    fn test_full_table_sweeps_at_most_once_per_interval() {
        let limiter = RateLimiter::new(60, 1);
        let now = Instant::now();
        for i in 0..MAX_TRACKED_CLIENTS {
            assert!(limiter.try_acquire_at(&format!("client-{}", i), now).is_ok());
        }

        // 表滿且沒有可回收的 bucket：第一次新用戶端觸發清理，之後同一區間內不再掃描
        assert!(limiter.try_acquire_at("newcomer-1", now).is_ok());
        let swept_at = limiter.state.lock().unwrap().last_sweep;
        assert_eq!(swept_at, Some(now));

        let later = now + Duration::from_millis(10);
        assert!(limiter.try_acquire_at("newcomer-2", later).is_ok());
        assert_eq!(limiter.state.lock().unwrap().last_sweep, Some(now));

        // 補滿之後的 bucket 會在下一次清理時被移除
        let refilled = now + Duration::from_secs(5);
        assert!(limiter.try_acquire_at("newcomer-3", refilled).is_ok());
        let state = limiter.state.lock().unwrap();
        assert_eq!(state.last_sweep, Some(refilled));
        assert_eq!(state.buckets.len(), 1);
    }

    #[test]
    fn test_disabled_settings_build_nothing() {
        let settings = RateLimitSettings {
            enabled: false,
            requests_per_minute: 10,
            burst: 10,
        };
        assert!(RateLimiter::from_settings(&settings).is_none());
    }
}
