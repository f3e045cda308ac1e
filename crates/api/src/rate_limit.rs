use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const PRUNE_ABOVE_CLIENTS: usize = 4_096;

/// Sliding-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    windows: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        if windows.len() > PRUNE_ABOVE_CLIENTS {
            windows.retain(|_, hits| {
                hits.back()
                    .is_some_and(|last| now.duration_since(*last) <= self.window)
            });
        }

        let hits = windows.entry(key.to_string()).or_default();

        while hits
            .front()
            .is_some_and(|first| now.duration_since(*first) > self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            return false;
        }

        hits.push_back(now);
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }
}
