//! Exchange integration module
//!
//! The market data seam the backfill loop pulls candles through.

pub mod client;

pub use client::*;
