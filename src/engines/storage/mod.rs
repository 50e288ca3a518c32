//! Record-level parsing infrastructure for tab-separated formats

pub mod formats;

pub use formats::{parse_coordinate, parse_optional, split_fields, LineParser, RecordReader};
