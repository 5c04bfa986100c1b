//! Batch run tallies and the final report

use crate::models::{BatchRun, SongKey};
use serde::Serialize;
use std::fmt;

/// Counters accumulated across every phase of one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    /// Retry queue size observed at INIT
    pub pending_at_start: usize,
    /// Documents found by the scan
    pub documents_found: usize,
    /// Documents read and extracted successfully
    pub documents_processed: usize,
    /// Documents that could not be read or parsed
    pub documents_failed: usize,
    pub candidates_extracted: usize,
    /// Successful inserts, scanned and drained
    pub inserted: usize,
    /// Duplicates, scanned and drained
    pub skipped: usize,
    /// Failed insert attempts, scanned and drained
    pub errors: usize,
    /// Queue entries fed back through the insert path
    pub drained: usize,
    /// Drained entries inserted and removed from the queue
    pub reinserted: usize,
    /// Retry queue or archive writes that failed
    pub queue_failures: usize,
    /// Keys moved to the dead-letter archive during this run
    pub dead_lettered: Vec<SongKey>,
}

/// Aggregate outcome emitted in REPORT
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run: BatchRun,
    pub statistics: RunStatistics,
    /// Retry queue size after FINAL_DRAIN
    pub pending_after: usize,
}

impl RunSummary {
    /// True when the run left nothing behind in the queue and had no failures
    pub fn is_clean(&self) -> bool {
        self.statistics.errors == 0
            && self.statistics.documents_failed == 0
            && self.statistics.queue_failures == 0
            && self.pending_after == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.statistics;
        let states: Vec<String> = self
            .run
            .visited_states()
            .iter()
            .map(|s| s.to_string())
            .collect();

        writeln!(f, "Batch run {}", self.run.run_id)?;
        writeln!(f, "  states:               {}", states.join(" -> "))?;
        writeln!(f, "  duration:             {} ms", self.run.duration_ms())?;
        writeln!(
            f,
            "  documents processed:  {} of {} ({} failed)",
            stats.documents_processed, stats.documents_found, stats.documents_failed
        )?;
        writeln!(f, "  candidates extracted: {}", stats.candidates_extracted)?;
        writeln!(f, "  inserted:             {}", stats.inserted)?;
        writeln!(f, "  skipped (duplicate):  {}", stats.skipped)?;
        writeln!(f, "  errored:              {}", stats.errors)?;
        writeln!(
            f,
            "  retry queue:          {} before, {} drained, {} reinserted, {} after",
            stats.pending_at_start, stats.drained, stats.reinserted, self.pending_after
        )?;
        if stats.queue_failures > 0 {
            writeln!(f, "  queue write failures: {}", stats.queue_failures)?;
        }
        write!(f, "  dead-lettered:        {}", stats.dead_lettered.len())?;
        for key in &stats.dead_lettered {
            write!(f, "\n    - {}", key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchState;

    fn finished_run() -> BatchRun {
        let mut run = BatchRun::new();
        run.transition_to(BatchState::Scanning);
        run.transition_to(BatchState::FinalDrain);
        run.transition_to(BatchState::Report);
        run
    }

    #[test]
    fn test_report_lists_states_and_dead_letters() {
        let summary = RunSummary {
            run: finished_run(),
            statistics: RunStatistics {
                documents_found: 1,
                documents_processed: 1,
                candidates_extracted: 2,
                inserted: 1,
                errors: 1,
                dead_lettered: vec![SongKey::new("Oasis", "Wonderwall", "1")],
                ..Default::default()
            },
            pending_after: 0,
        };

        let text = summary.to_string();
        assert!(text.contains("INIT -> SCANNING -> FINAL_DRAIN -> REPORT"));
        assert!(text.contains("inserted:             1"));
        assert!(text.contains("- Oasis - Wonderwall [1]"));
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_clean_run() {
        let summary = RunSummary {
            run: finished_run(),
            statistics: RunStatistics {
                inserted: 2,
                ..Default::default()
            },
            pending_after: 0,
        };

        assert!(summary.is_clean());
        assert!(!summary.to_string().contains("queue write failures"));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = RunSummary {
            run: finished_run(),
            statistics: RunStatistics::default(),
            pending_after: 3,
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pending_after"], 3);
        assert_eq!(json["run"]["state"], "REPORT");
    }
}
