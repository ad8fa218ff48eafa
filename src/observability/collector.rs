use crate::core::StepId;
use super::{ComponentStatistics, WorkerStatistics};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    pub step_id: StepId,
    pub workers: usize,
    pub totals: WorkerStatistics,
}

/// Registry of the statistics of every step in one flow run.
#[derive(Clone, Default)]
pub struct StatisticsCollector {
    statistics: BTreeMap<StepId, Arc<ComponentStatistics>>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, statistics: Arc<ComponentStatistics>) {
        self.statistics.insert(statistics.step_id().clone(), statistics);
    }

    pub fn snapshot(&self) -> BTreeMap<StepId, StatisticsSnapshot> {
        self.statistics
            .iter()
            .map(|(id, stats)| {
                (
                    id.clone(),
                    StatisticsSnapshot {
                        step_id: id.clone(),
                        workers: stats.worker_count(),
                        totals: stats.totals(),
                    },
                )
            })
            .collect()
    }

    pub fn get(&self, step_id: &str) -> Option<Arc<ComponentStatistics>> {
        self.statistics.get(step_id).cloned()
    }

    pub fn clear(&mut self) {
        self.statistics.clear();
    }
}
