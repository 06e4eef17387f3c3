use hdrhistogram::Histogram;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Call statistics for the generative model.
#[derive(Debug)]
pub struct ProviderStats {
    pub request_count: AtomicU64,
    pub error_count: AtomicU64,
    // EWMA of latency (microseconds)
    pub ewma_latency_us: AtomicU64,
    pub consec_errors: AtomicU32,
    latency_us: Mutex<Option<Histogram<u64>>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub consecutive_errors: u32,
    pub ewma_ms: f64,
    pub p50_ms: f64,
    pub p99_ms: f64,
}

impl Default for ProviderStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderStats {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            ewma_latency_us: AtomicU64::new(0),
            consec_errors: AtomicU32::new(0),
            // 1us .. 10min, 3 significant figures
            latency_us: Mutex::new(Histogram::new_with_bounds(1, 600_000_000, 3).ok()),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.store(0, Ordering::Relaxed);

        let latency_us = latency.as_micros() as u64;

        // new_avg = (old_avg * 7 + sample) / 8
        let mut old = self.ewma_latency_us.load(Ordering::Relaxed);
        loop {
            let new_val = if old == 0 {
                latency_us
            } else {
                (old * 7 + latency_us) / 8
            };

            match self.ewma_latency_us.compare_exchange_weak(
                old,
                new_val,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => old = x,
            }
        }

        let mut hist = self.latency_us.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hist) = hist.as_mut() {
            hist.saturating_record(latency_us.max(1));
        }
    }

    pub fn record_failure(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let hist = self.latency_us.lock().unwrap_or_else(PoisonError::into_inner);
        let to_ms = |us: u64| us as f64 / 1000.0;
        let quantile = |q: f64| hist.as_ref().map_or(0, |h| h.value_at_quantile(q));
        StatsSnapshot {
            requests: self.request_count.load(Ordering::Relaxed),
            errors: self.error_count.load(Ordering::Relaxed),
            consecutive_errors: self.consec_errors.load(Ordering::Relaxed),
            ewma_ms: to_ms(self.ewma_latency_us.load(Ordering::Relaxed)),
            p50_ms: to_ms(quantile(0.50)),
            p99_ms: to_ms(quantile(0.99)),
        }
    }
}
