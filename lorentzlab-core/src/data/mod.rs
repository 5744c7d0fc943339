//! Market data sources available without I/O.

pub mod synthetic;

pub use synthetic::{random_walk_bars, ramp_bars, SyntheticConfig};
