//! Scan progress reporting.

use std::time::{Duration, Instant};

use dicomtree_core::ScanWarning;

/// Progress information during a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Files handed to the sniffer so far.
    pub files_visited: u64,
    /// Folders listed so far.
    pub dirs_visited: u64,
    /// Records delivered to the consumer.
    pub records_emitted: u64,
    /// Files skipped by the inclusion policy.
    pub files_excluded: u64,
    /// Candidate files that could not be parsed.
    pub files_failed: u64,
    /// Last file visited.
    pub current_path: String,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
    /// Whether the consumer stopped the scan early.
    pub cancelled: bool,
    /// Non-fatal problems met so far.
    pub warning_count: u64,
    /// The warnings themselves; only filled in the final progress.
    pub warnings: Vec<ScanWarning>,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_visited as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Whether every visited file is accounted for.
    pub fn is_consistent(&self) -> bool {
        self.records_emitted + self.files_excluded + self.files_failed <= self.files_visited
    }
}

/// Progress tracker with timing, owned by the producer.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    progress: ScanProgress,
    warnings: Vec<ScanWarning>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            progress: ScanProgress::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_file(&mut self, path: &str) {
        self.progress.files_visited += 1;
        self.progress.current_path.clear();
        self.progress.current_path.push_str(path);
    }

    pub fn record_emitted(&mut self) {
        self.progress.records_emitted += 1;
    }

    pub fn record_excluded(&mut self) {
        self.progress.files_excluded += 1;
    }

    pub fn record_failed(&mut self, warning: ScanWarning) {
        self.progress.files_failed += 1;
        self.warnings.push(warning);
        self.progress.warning_count += 1;
    }

    pub fn record_warnings(&mut self, warnings: Vec<ScanWarning>) {
        self.progress.warning_count += warnings.len() as u64;
        self.warnings.extend(warnings);
    }

    pub fn set_dirs_visited(&mut self, dirs: u64) {
        self.progress.dirs_visited = dirs;
    }

    pub fn mark_cancelled(&mut self) {
        self.progress.cancelled = true;
    }

    pub fn files_visited(&self) -> u64 {
        self.progress.files_visited
    }

    /// Counters so far; warnings are counted but not copied.
    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            elapsed: self.start_time.elapsed(),
            ..self.progress.clone()
        }
    }

    pub fn finish(mut self) -> ScanProgress {
        self.progress.elapsed = self.start_time.elapsed();
        self.progress.warnings = self.warnings;
        self.progress
    }
}
