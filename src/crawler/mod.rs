//! Per-region crawl workers and their orchestration

mod pool;
mod worker;

pub use pool::run_harvest;
pub use worker::{RegionWorker, RoundError};
