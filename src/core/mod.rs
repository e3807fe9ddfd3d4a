// BattScan - core/mod.rs
//
// Core layer: pure extraction logic over the Document Index boundary.
// No filesystem paths, no terminal, no persistence concerns here.

pub mod discovery;
pub mod index;
pub mod latest;
pub mod model;
pub mod parser;
pub mod sections;
