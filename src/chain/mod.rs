//! Chain Module
//! 
//! This module stands in for the hosting chain's logical clock:
//! - BlockClock: shared, monotonically non-decreasing block height
//! - BlockProducer: background loop that advances the height at a fixed interval

mod clock;
mod producer;

pub use clock::BlockClock;
pub use producer::BlockProducer;
