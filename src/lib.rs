pub mod config;
pub mod error;
pub mod reader;
pub mod record;
pub mod scan;

pub use error::ReadError;
pub use reader::{read_last_record, read_last_record_with, HeaderMode, ReaderOptions};
pub use record::{Record, ResultSet};
pub use scan::{scan_directory, scan_directory_report, FileFailure, ScanOptions, ScanReport};
