pub mod args;
pub mod batch;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod schema;
pub mod sender;
pub mod transaction;
pub mod types;
