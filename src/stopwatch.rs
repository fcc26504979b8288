use std::time::Instant;

use tdigest::TDigest;

/// Collects request latencies, labeled by the operation that was timed.
#[derive(Clone)]
pub struct Stopwatch {
    start_time: Instant,
    durations: Vec<LabeledDurationMicros>,
}

pub type LabeledDurationMicros = (&'static str, f64);

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            start_time: Instant::now(),
            durations: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn stop(&mut self, label: &'static str) {
        let duration_as_micros = self.start_time.elapsed().as_micros() as f64;
        self.durations.push((label, duration_as_micros));
    }

    pub fn get_n(&self) -> usize {
        self.durations.len()
    }

    /// Estimated latency percentile over all recorded durations, 0.0 when
    /// nothing was recorded.
    pub fn get_percentile_in_micros(&self, q: f64) -> f64 {
        self.percentile(q, |_| true)
    }

    pub fn get_percentile_for_label_in_micros(&self, label: &str, q: f64) -> f64 {
        self.percentile(q, |recorded| recorded == label)
    }

    pub fn get_raw_durations(&self) -> &[LabeledDurationMicros] {
        &self.durations
    }

    fn percentile<F: Fn(&str) -> bool>(&self, q: f64, include: F) -> f64 {
        let durations: Vec<f64> = self
            .durations
            .iter()
            .filter(|(label, _)| include(*label))
            .map(|(_, micros)| *micros)
            .collect();
        if durations.is_empty() {
            return 0.0;
        }
        TDigest::new_with_size(100)
            .merge_unsorted(durations)
            .estimate_quantile(q)
    }
}

#[cfg(test)]
mod stopwatch_test {
    use super::*;

    #[test]
    fn should_record_labeled_durations() {
        let mut stopwatch = Stopwatch::new();
        stopwatch.start();
        stopwatch.stop("item");
        stopwatch.start();
        stopwatch.stop("group");

        assert_eq!(2, stopwatch.get_n());
        assert_eq!("item", stopwatch.get_raw_durations()[0].0);
        assert!(stopwatch.get_percentile_in_micros(0.5) >= 0.0);
    }

    #[test]
    fn should_estimate_percentiles_per_label() {
        let mut stopwatch = Stopwatch::new();
        stopwatch.durations = (1..=100)
            .map(|micros| ("item", micros as f64))
            .chain(std::iter::once(("group", 5000.0)))
            .collect();

        let p100 = stopwatch.get_percentile_for_label_in_micros("item", 1.0);
        assert!((p100 - 100.0).abs() < 1.0);
        let p50 = stopwatch.get_percentile_for_label_in_micros("item", 0.5);
        assert!((p50 - 50.0).abs() < 2.0);
        assert_eq!(0.0, stopwatch.get_percentile_for_label_in_micros("actor", 0.5));
    }
}
