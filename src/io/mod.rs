//! I/O layer: byte-range access to raster files.

mod file_reader;
mod range_reader;

pub use file_reader::FileRangeReader;
pub use range_reader::{check_range, RangeReader};
