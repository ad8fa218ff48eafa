use crate::core::StepId;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Counters for one worker of a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatistics {
    pub entities_processed: u64,
    pub inbound_messages: u64,
    pub outbound_messages: u64,
    pub errors: u64,
    pub handle_time_us: u64,
}

/// Per-run counters of one step, keyed by worker index.
///
/// Workers of a step share one instance; each only ever touches its own entry.
#[derive(Debug)]
pub struct ComponentStatistics {
    step_id: StepId,
    workers: DashMap<usize, WorkerStatistics>,
}

impl ComponentStatistics {
    pub fn new(step_id: impl Into<StepId>) -> Self {
        Self {
            step_id: step_id.into(),
            workers: DashMap::new(),
        }
    }

    pub fn step_id(&self) -> &StepId {
        &self.step_id
    }

    fn update(&self, worker: usize, f: impl FnOnce(&mut WorkerStatistics)) {
        f(&mut self.workers.entry(worker).or_default());
    }

    pub fn increment_entities_processed(&self, worker: usize) {
        self.add_entities_processed(worker, 1);
    }

    pub fn add_entities_processed(&self, worker: usize, count: u64) {
        self.update(worker, |s| s.entities_processed += count);
    }

    pub fn increment_inbound_messages(&self, worker: usize) {
        self.update(worker, |s| s.inbound_messages += 1);
    }

    pub fn increment_outbound_messages(&self, worker: usize) {
        self.update(worker, |s| s.outbound_messages += 1);
    }

    pub fn record_error(&self, worker: usize) {
        self.update(worker, |s| s.errors += 1);
    }

    pub fn start_handling(&self) -> Instant {
        Instant::now()
    }

    pub fn finish_handling(&self, worker: usize, start: Instant) {
        let elapsed = start.elapsed().as_micros() as u64;
        self.update(worker, |s| s.handle_time_us += elapsed);
    }

    pub fn worker(&self, worker: usize) -> WorkerStatistics {
        self.workers.get(&worker).map(|s| *s).unwrap_or_default()
    }

    pub fn entities_processed(&self, worker: usize) -> u64 {
        self.worker(worker).entities_processed
    }

    pub fn inbound_messages(&self, worker: usize) -> u64 {
        self.worker(worker).inbound_messages
    }

    pub fn outbound_messages(&self, worker: usize) -> u64 {
        self.worker(worker).outbound_messages
    }

    pub fn errors(&self, worker: usize) -> u64 {
        self.worker(worker).errors
    }

    /// Sum over all workers.
    pub fn totals(&self) -> WorkerStatistics {
        self.workers.iter().fold(WorkerStatistics::default(), |mut acc, entry| {
            let s = entry.value();
            acc.entities_processed += s.entities_processed;
            acc.inbound_messages += s.inbound_messages;
            acc.outbound_messages += s.outbound_messages;
            acc.errors += s.errors;
            acc.handle_time_us += s.handle_time_us;
            acc
        })
    }

    pub fn handle_time(&self) -> Duration {
        Duration::from_micros(self.totals().handle_time_us)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}
