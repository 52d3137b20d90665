//! Personal record keeper for expenses, memos, todos and credentials.
//! Records are kept as JSON blobs on disk and turned into grouped lists, month calendars,
//! category charts and memo trees from a terminal.
//!

pub mod aggregation;
pub mod cli;
pub mod fs;
pub mod storage;
pub mod utils;
