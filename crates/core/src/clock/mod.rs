//! Clock-in/clock-out entry points

pub mod history;
pub mod submitter;

pub use history::{ShiftHistory, ShiftListing};
pub use submitter::ClockSubmitter;
