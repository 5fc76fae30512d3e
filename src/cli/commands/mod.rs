//! CLI command implementations

pub mod config;
pub mod get;
pub mod list;
pub mod store;

pub use config::execute as config;
pub use get::execute as get;
pub use list::execute as list;
pub use store::execute as store;
