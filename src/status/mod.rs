//! Status - queue depth, open work, historical metrics and health

mod aggregator;
mod scan;

pub use aggregator::{
    Concern, DEFAULT_RECENT_MERGES, Health, MAX_IN_PROGRESS, NextStep, StatusAggregator, StatusView,
};
pub use scan::{ScanResult, scan};
