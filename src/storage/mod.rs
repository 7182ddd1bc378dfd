pub mod json;
pub mod sqlite;

pub use json::LatestPricesFile;
pub use sqlite::SqliteStorage;
