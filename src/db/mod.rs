pub mod activities;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod pool;
pub mod projects;
pub mod queries;
pub mod store;

pub use pool::DbPool;
pub use store::{AttendanceStore, SqliteStore};
