//! Billing lifecycle automation for Upkeep.
//!
//! Detects clients whose billing date has lapsed and moves them to `due`
//! with a reminder flag, recording every run in the automation log.

pub mod checker;

pub use checker::{BillingStatusChecker, CheckOutcome, StatusCounts};
