pub mod collector;
pub mod monitor;
pub mod statistics;

pub use collector::{StatisticsCollector, StatisticsSnapshot};
pub use monitor::FlowMonitor;
pub use statistics::{ComponentStatistics, WorkerStatistics};
