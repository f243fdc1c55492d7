pub mod driver;
pub mod query_handlers;
