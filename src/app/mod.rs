// BattScan - app/mod.rs
//
// Application layer: scan orchestration and the persisted result cache.

pub mod cache;
pub mod scan;
