//! Data management module
//!
//! Candle persistence and checkpoint persistence.

pub mod checkpoint;
pub mod storage;

pub use checkpoint::*;
pub use storage::*;
