pub mod table;
pub mod tracker;

pub use table::format;
pub use tracker::ProgressTracker;
