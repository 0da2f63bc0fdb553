use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for analysis-run events, so use cases stay independent of how
/// progress is shown.
pub trait AnalysisLogger: Send {
    /// `current` frames of `total` have been analyzed.
    fn progress(&mut self, current: usize, total: usize);

    /// Duration of one stage (`decode`, `detect`, `analyze`, ...) for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Per-frame observation such as person count or head-up rate.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. For tests and embedding callers.
pub struct NullAnalysisLogger;

impl AnalysisLogger for NullAnalysisLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count, sum, min and max of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Logs through `log::info!`: throttled progress, and a summary with
/// per-stage timings, metric ranges and throughput.
pub struct StdoutAnalysisLogger {
    every_n_frames: usize,
    stages: BTreeMap<String, SeriesStats>,
    metrics: BTreeMap<String, SeriesStats>,
    started: Instant,
    frames_done: usize,
}

impl StdoutAnalysisLogger {
    pub fn new(every_n_frames: usize) -> Self {
        Self {
            every_n_frames: every_n_frames.max(1),
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            frames_done: 0,
        }
    }

    pub fn stage(&self, stage: &str) -> Option<&SeriesStats> {
        self.stages.get(stage)
    }

    pub fn metric_stats(&self, name: &str) -> Option<&SeriesStats> {
        self.metrics.get(name)
    }

    /// The summary text, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }
        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Analyzed {} frames in {elapsed_s:.1}s",
            self.frames_done
        )];

        for (stage, stats) in &self.stages {
            lines.push(format!(
                "  {stage:10} mean {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                stats.mean(),
                stats.max,
                stats.sum
            ));
        }
        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: mean {:.2} (min {:.2}, max {:.2})",
                stats.mean(),
                stats.min,
                stats.max
            ));
        }
        if self.frames_done > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} frames/s",
                self.frames_done as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for StdoutAnalysisLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl AnalysisLogger for StdoutAnalysisLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        if current % self.every_n_frames == 0 || current == total {
            if total > 0 {
                let pct = current as f64 / total as f64 * 100.0;
                log::info!("Analyzed {current}/{total} frames ({pct:.0}%)");
            } else {
                log::info!("Analyzed {current} frames");
            }
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages
            .entry(stage.to_string())
            .or_insert_with(SeriesStats::new)
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_insert_with(SeriesStats::new)
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullAnalysisLogger;
        logger.progress(1, 2);
        logger.timing("detect", 3.0);
        logger.metric("persons", 4.0);
        logger.info("hi");
        logger.summary();
    }

    #[test]
    fn test_stage_timings_accumulate() {
        let mut logger = StdoutAnalysisLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 40.0);
        logger.timing("analyze", 1.0);

        let detect = logger.stage("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.mean(), 30.0);
        assert_relative_eq!(detect.max, 40.0);
        assert_eq!(logger.stage("analyze").unwrap().count, 1);
        assert!(logger.stage("export").is_none());
    }

    #[test]
    fn test_metric_range() {
        let mut logger = StdoutAnalysisLogger::new(10);
        for v in [0.5, 1.0, 0.0] {
            logger.metric("head_up_rate", v);
        }
        let stats = logger.metric_stats("head_up_rate").unwrap();
        assert_relative_eq!(stats.mean(), 0.5);
        assert_relative_eq!(stats.min, 0.0);
        assert_relative_eq!(stats.max, 1.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutAnalysisLogger::new(10);
        logger.progress(4, 4);
        logger.timing("detect", 10.0);
        logger.metric("persons", 3.0);

        let text = logger.summary_string().unwrap();
        assert!(text.starts_with("Analyzed 4 frames"));
        assert!(text.contains("detect"));
        assert!(text.contains("persons: mean 3.00"));
    }

    #[test]
    fn test_summary_empty_before_any_record() {
        assert!(StdoutAnalysisLogger::default().summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames_done() {
        let mut logger = StdoutAnalysisLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 7);
        }
        assert_eq!(logger.frames_done, 7);
        assert_eq!(logger.every_n_frames, 3);
    }
}
