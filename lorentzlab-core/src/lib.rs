//! LorentzLab Core: the bar-by-bar trading decision engine.
//!
//! This crate contains everything that decides, and nothing that does I/O:
//! - Domain types (bars, snapshots, positions, decisions, trades)
//! - Indicator derivation (Wilder RSI/ADX, daily/weekly session levels)
//! - Online feature normalisation and the Lorentzian distance
//! - A self-labelling k-nearest-neighbour classifier over a ring buffer
//! - Position sizing, exposure caps, daily drawdown guard, ADR tracking
//! - `TradeLogic`, which turns one snapshot into open/close decisions
//! - Seeded synthetic market data

pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod logic;
pub mod risk;
pub mod strategy;

pub use logic::{TradeConfig, TradeLogic, TradeLogicError};
