//! Named wall-clock timers with per-phase averaging.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulates elapsed-time samples per phase name.
///
/// Regions are bracketed with [`Profiler::begin`] / [`Profiler::end`]; the
/// most recently opened region is the one closed.
#[derive(Debug, Default)]
pub struct Profiler {
    samples: HashMap<String, Vec<Duration>>,
    open: Vec<(String, Instant)>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `phase`.
    pub fn begin(&mut self, phase: &str) {
        self.open.push((phase.to_string(), Instant::now()));
    }

    /// Stop the innermost open region and record its sample.
    ///
    /// Returns `None` when no region is open.
    pub fn end(&mut self) -> Option<Duration> {
        let (phase, start) = self.open.pop()?;
        let elapsed = start.elapsed();
        self.record(&phase, elapsed);
        Some(elapsed)
    }

    /// Record a sample measured elsewhere.
    pub fn record(&mut self, phase: &str, elapsed: Duration) {
        self.samples.entry(phase.to_string()).or_default().push(elapsed);
    }

    /// Run `f` inside a `phase` region.
    pub fn time<T>(&mut self, phase: &str, f: impl FnOnce() -> T) -> T {
        self.begin(phase);
        let out = f();
        self.end();
        out
    }

    pub fn samples(&self, phase: &str) -> &[Duration] {
        self.samples.get(phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Arithmetic mean of the samples of `phase`, `None` if it has none.
    pub fn mean_duration(&self, phase: &str) -> Option<Duration> {
        let samples = self.samples.get(phase)?;
        if samples.is_empty() {
            return None;
        }
        let total: Duration = samples.iter().sum();
        match u32::try_from(samples.len()) {
            Ok(n) => Some(total / n),
            Err(_) => Some(total.div_f64(samples.len() as f64)),
        }
    }

    /// Mean duration in milliseconds.
    pub fn mean_ms(&self, phase: &str) -> Option<f64> {
        self.mean_duration(phase).map(|d| d.as_secs_f64() * 1e3)
    }

    /// Phases with at least one sample, sorted by name.
    pub fn phases(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samples.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_open(&self) -> bool {
        !self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_recorded_samples() {
        let mut profiler = Profiler::new();
        for ms in [10, 20, 30] {
            profiler.record("features", Duration::from_millis(ms));
        }
        assert_eq!(profiler.mean_duration("features"), Some(Duration::from_millis(20)));
        assert!((profiler.mean_ms("features").unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_samples_is_none() {
        let profiler = Profiler::new();
        assert_eq!(profiler.mean_duration("detection"), None);
        assert_eq!(profiler.mean_ms("detection"), None);
        assert!(profiler.samples("detection").is_empty());
    }

    #[test]
    fn test_begin_end_records_sample() {
        let mut profiler = Profiler::new();
        profiler.begin("features");
        assert!(profiler.is_open());
        let elapsed = profiler.end().unwrap();
        assert!(!profiler.is_open());
        assert_eq!(profiler.samples("features"), &[elapsed]);
    }

    #[test]
    fn test_end_closes_last_opened() {
        let mut profiler = Profiler::new();
        profiler.begin("outer");
        profiler.begin("inner");
        profiler.end();
        assert_eq!(profiler.samples("inner").len(), 1);
        assert!(profiler.samples("outer").is_empty());
        profiler.end();
        assert_eq!(profiler.samples("outer").len(), 1);
        assert_eq!(profiler.phases(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_end_without_begin() {
        let mut profiler = Profiler::new();
        assert!(profiler.end().is_none());
        assert!(profiler.phases().is_empty());
    }

    #[test]
    fn test_time_closure() {
        let mut profiler = Profiler::new();
        let v = profiler.time("detection", || 41 + 1);
        assert_eq!(v, 42);
        assert_eq!(profiler.samples("detection").len(), 1);
    }
}
