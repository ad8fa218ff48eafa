use super::{StatisticsCollector, StatisticsSnapshot};
use std::fmt::Write;

/// Human-readable view over the statistics of one flow run.
pub struct FlowMonitor {
    collector: StatisticsCollector,
}

impl FlowMonitor {
    pub fn new(collector: StatisticsCollector) -> Self {
        Self { collector }
    }

    /// One block per step, ordered by step id.
    pub fn generate_report(&self) -> String {
        let snapshot = self.collector.snapshot();
        if snapshot.is_empty() {
            return "No steps registered".to_string();
        }

        let mut report = String::from("=== Flow Statistics ===\n");
        for step in snapshot.values() {
            write_step(&mut report, step);
        }
        report
    }

    pub fn collector(&self) -> &StatisticsCollector {
        &self.collector
    }
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn write_step(report: &mut String, step: &StatisticsSnapshot) {
    let totals = &step.totals;
    // Writing into a String cannot fail
    let _ = write!(
        report,
        "\n[{}] {}\n  entities: {} processed\n  messages: {} in / {} out\n  errors:   {}\n  handle:   {}µs\n",
        step.step_id,
        plural(step.workers as u64, "worker"),
        totals.entities_processed,
        totals.inbound_messages,
        totals.outbound_messages,
        plural(totals.errors, "error"),
        totals.handle_time_us,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::ComponentStatistics;
    use std::sync::Arc;

    #[test]
    fn test_report_pluralizes_counts() {
        let mut collector = StatisticsCollector::new();
        let statistics = Arc::new(ComponentStatistics::new("format"));
        statistics.record_error(0);
        statistics.record_error(0);
        collector.register(statistics);

        let report = FlowMonitor::new(collector).generate_report();
        assert!(report.contains("[format] 1 worker\n"));
        assert!(report.contains("errors:   2 errors"));
    }
}
