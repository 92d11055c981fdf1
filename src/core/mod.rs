//! Core domain logic: periods, return math, SIP aggregation and shared
//! infrastructure (config, cache, errors).

pub mod cache;
pub mod config;
pub mod error;
pub mod fund;
pub mod log;
pub mod period;
pub mod returns;
pub mod sip;

// Re-export main types for cleaner imports
pub use error::AppError;
pub use period::{Frequency, Period, PeriodWindow};
pub use returns::NavPoint;
