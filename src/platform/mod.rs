// BattScan - platform/mod.rs
//
// Platform layer: the concrete filesystem Document Index and the
// platform-specific configuration/data directory handling.

pub mod config;
pub mod fs;
