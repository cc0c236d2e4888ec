//! TrackMyCoin
//!
//! Fills the due offset prices of a Google Sheets coin-price ledger from
//! CoinGecko and writes the sheet back.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod rate_limit;
