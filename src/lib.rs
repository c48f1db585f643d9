//! Tracks how much active time is spent on each website. The browser side only forwards tab,
//! focus and idle events; the tracker turns them into per day, per domain totals and the cli
//! reads those back.
//!

pub mod cli;
pub mod daemon;
pub mod utils;
