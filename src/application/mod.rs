//! Application layer: service orchestration and background reconciliation.

pub mod reaper;
pub mod services;
