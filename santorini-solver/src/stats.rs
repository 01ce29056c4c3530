//! Search statistics tracking.

use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::solver::Label;

/// Current process memory usage in bytes (resident set size).
/// Returns None if unable to determine.
#[cfg(target_os = "linux")]
pub fn get_memory_usage() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}

#[cfg(not(target_os = "linux"))]
pub fn get_memory_usage() -> Option<u64> {
    None
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Statistics collected during a search session.
#[derive(Debug, Clone, Default)]
pub struct SolverStats {
    /// Nodes entered and charged against the node budget
    pub nodes_visited: u64,

    /// Interior nodes resolved from their children
    pub positions_evaluated: u64,

    /// Memo hits on resolved entries
    pub cache_hits: u64,

    /// Memo hits on entries still being expanded
    pub in_progress_hits: u64,

    /// Terminal nodes (win or loss for the side to move)
    pub terminal_positions: u64,

    /// Maximum stack depth reached
    pub max_depth: u64,

    /// Children skipped after a winning child was found
    pub branches_pruned: u64,

    /// Entries refused because a budget was spent
    pub budget_exhausted: u64,

    /// Children scored by the sampler
    pub samples_taken: u64,

    /// Terminal breakdown
    pub p1_wins: u64,
    pub p2_wins: u64,

    /// Interior nodes left undecided
    pub undecided: u64,

    /// For rate calculation
    start_time: Option<Instant>,
    last_log_time: Option<Instant>,
    last_log_visits: u64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            last_log_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Record a terminal node's label.
    pub fn record_terminal(&mut self, label: Label) {
        self.terminal_positions += 1;
        match label {
            Label::WinP1 => self.p1_wins += 1,
            Label::WinP2 => self.p2_wins += 1,
            Label::Undecided => {}
        }
    }

    /// Record an interior node's final label.
    pub fn record_resolved(&mut self, label: Label) {
        self.positions_evaluated += 1;
        if label == Label::Undecided {
            self.undecided += 1;
        }
    }

    /// Node visits per second since the session started.
    pub fn visits_per_sec(&self) -> f64 {
        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                return self.nodes_visited as f64 / elapsed;
            }
        }
        0.0
    }

    /// Check if we should log progress
    pub fn should_log(&self, interval_secs: u64) -> bool {
        match self.last_log_time {
            Some(last) => last.elapsed().as_secs() >= interval_secs,
            None => true,
        }
    }

    /// Percentage of considered children that were skipped.
    pub fn pruning_pct(&self) -> f64 {
        let considered = self.nodes_visited + self.cache_hits + self.branches_pruned;
        if considered > 0 {
            100.0 * self.branches_pruned as f64 / considered as f64
        } else {
            0.0
        }
    }

    /// Log progress and reset log timer
    pub fn log_progress(&mut self, memo_size: usize) {
        let now = Instant::now();
        let elapsed_total = self.start_time.map(|s| s.elapsed().as_secs()).unwrap_or(0);

        let rate = match self.last_log_time {
            Some(last) => {
                let elapsed = last.elapsed().as_secs_f64();
                let visits = self.nodes_visited - self.last_log_visits;
                if elapsed > 0.0 {
                    visits as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => self.visits_per_sec(),
        };

        let mem_str = get_memory_usage()
            .map(|m| format!(" mem={}", format_bytes(m)))
            .unwrap_or_default();

        info!(
            "[{:02}:{:02}:{:02}] visited={} memo={} cache_hits={} rate={:.0}/s depth={} pruned={:.1}%{}",
            elapsed_total / 3600,
            (elapsed_total % 3600) / 60,
            elapsed_total % 60,
            self.nodes_visited,
            memo_size,
            self.cache_hits,
            rate,
            self.max_depth,
            self.pruning_pct(),
            mem_str,
        );
        info!(
            "           terminals: p1={} p2={} undecided={} budget_hits={}",
            self.p1_wins, self.p2_wins, self.undecided, self.budget_exhausted
        );

        self.last_log_time = Some(now);
        self.last_log_visits = self.nodes_visited;
    }
}

impl fmt::Display for SolverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nodes visited: {}", self.nodes_visited)?;
        writeln!(f, "Positions evaluated: {}", self.positions_evaluated)?;
        writeln!(f, "Cache hits: {}", self.cache_hits)?;
        writeln!(f, "Terminal positions: {}", self.terminal_positions)?;
        writeln!(f, "  - P1 wins: {}", self.p1_wins)?;
        writeln!(f, "  - P2 wins: {}", self.p2_wins)?;
        writeln!(f, "Undecided positions: {}", self.undecided)?;
        writeln!(f, "Max depth: {}", self.max_depth)?;
        writeln!(f, "Branches pruned: {}", self.branches_pruned)?;
        writeln!(f, "Budget hits: {}", self.budget_exhausted)?;
        write!(f, "Average rate: {:.0} nodes/sec", self.visits_per_sec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_record_terminal() {
        let mut stats = SolverStats::new();
        stats.record_terminal(Label::WinP1);
        stats.record_terminal(Label::WinP2);
        stats.record_terminal(Label::WinP2);
        assert_eq!(stats.terminal_positions, 3);
        assert_eq!(stats.p1_wins, 1);
        assert_eq!(stats.p2_wins, 2);
    }

    #[test]
    fn test_record_resolved() {
        let mut stats = SolverStats::new();
        stats.record_resolved(Label::WinP1);
        stats.record_resolved(Label::Undecided);
        assert_eq!(stats.positions_evaluated, 2);
        assert_eq!(stats.undecided, 1);
    }

    #[test]
    fn test_pruning_pct() {
        let mut stats = SolverStats::new();
        assert_eq!(stats.pruning_pct(), 0.0);
        stats.nodes_visited = 3;
        stats.branches_pruned = 1;
        assert!((stats.pruning_pct() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_should_log() {
        let stats = SolverStats::new();
        assert!(stats.should_log(0));
        assert!(!stats.should_log(3600));
        assert!(SolverStats::default().should_log(3600));
    }

    #[test]
    fn test_summary_lines() {
        let mut stats = SolverStats::new();
        stats.nodes_visited = 42;
        stats.branches_pruned = 7;
        let summary = stats.to_string();
        assert!(summary.contains("Nodes visited: 42"));
        assert!(summary.contains("Branches pruned: 7"));
        assert!(summary.lines().count() >= 10);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_memory_usage_linux() {
        assert!(get_memory_usage().is_some_and(|bytes| bytes > 0));
    }
}
