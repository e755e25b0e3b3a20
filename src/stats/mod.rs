//! Run statistics and the bounded execution history.

pub mod history;
pub mod metrics;

pub use history::{ExecutionHistory, ExecutionRecord};
pub use metrics::{
    AdmissionOutcome, InMemoryStatistics, NoopStatistics, StatisticsSink, StatisticsSnapshot,
    TeeStatistics,
};
