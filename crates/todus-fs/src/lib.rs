mod error;
pub mod primitives;

pub use error::{Error, Result};
pub use primitives::atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use primitives::split::{Part, part_name, split_file};
