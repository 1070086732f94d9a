//! Subscription analytics for Upkeep — status and plan distribution,
//! windowed revenue by plan, and the periodic report that combines them.

pub mod composer;
pub mod distribution;
pub mod revenue;

pub use composer::{health_percentage, ReportComposer};
pub use distribution::DistributionEngine;
pub use revenue::RevenueAggregationEngine;
