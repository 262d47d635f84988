//! Pump-and-take-profit trading loop for Binance spot.
//!
//! The buy loop watches a symbol universe for a 24h price change above a
//! trigger and places a marked-up limit buy; the sell loop places a limit sell
//! once a held position is far enough in profit and closes the position when
//! that sell fills.

pub mod config;
pub mod connectors;
pub mod engine;
pub mod error;
pub mod storage;
pub mod strategies;
pub mod types;
pub mod utils;
