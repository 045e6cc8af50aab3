pub mod selection;
pub mod window;

pub use selection::select_attendant;
pub use window::{cutoff_before, hours_threshold, is_stale, is_within_window, minutes_threshold};
