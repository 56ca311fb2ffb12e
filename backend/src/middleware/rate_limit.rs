use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory rate limiter protecting the session exchange endpoint from
/// token-guessing bursts
pub struct RateLimiter {
    /// Maps keys (client IP) to timestamps of recent attempts
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    /// Maximum number of attempts allowed within the time window
    max_attempts: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Check whether a request is allowed for this key
    pub fn check(&self, key: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);

        entry.len() < self.max_attempts
    }

    /// Record a failed attempt for a key
    pub fn record(&self, key: &str) {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);
        entry.push(now);
    }

    /// Clear attempts for a key after a successful exchange
    pub fn clear(&self, key: &str) {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_allows_under_limit() {
        let limiter = RateLimiter::new(3, 60);

        assert!(limiter.check("10.0.0.1"));
        limiter.record("10.0.0.1");
        assert!(limiter.check("10.0.0.1"));
        limiter.record("10.0.0.1");
        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_blocks_over_limit() {
        let limiter = RateLimiter::new(2, 60);

        limiter.record("10.0.0.1");
        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = RateLimiter::new(2, 1); // 1 second window

        limiter.record("10.0.0.1");
        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));

        sleep(Duration::from_secs(2));

        assert!(limiter.check("10.0.0.1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);

        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn test_clear_resets_key() {
        let limiter = RateLimiter::new(2, 60);

        limiter.record("10.0.0.1");
        limiter.record("10.0.0.1");
        assert!(!limiter.check("10.0.0.1"));

        limiter.clear("10.0.0.1");
        assert!(limiter.check("10.0.0.1"));
    }
}
