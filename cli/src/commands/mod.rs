//! CLI command handlers.

pub mod lists;
pub mod scrape;
pub mod status;
