//! GBA image handling for the cart map engine: header correction, padding
//! trim, title naming and header scans.

pub mod error;
pub mod fixtures;
pub mod header;
pub mod name;
pub mod scan;
pub mod tools;

pub use error::{Result, RomError};
pub use header::{correct_header, has_valid_header, romname, HeaderInfo};
pub use name::filename_to_romname;
pub use scan::{scan_headers, ScannedHeader};
pub use tools::{trim, GbaImages};
