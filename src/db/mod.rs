pub mod connection;
pub(crate) mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{Category, Session};
