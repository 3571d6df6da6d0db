//! Command implementations for the quire CLI

pub mod db;
pub mod serve;

pub use db::{run_check_db, run_init_db, DatabaseArgs};
pub use serve::{run_serve, ServeArgs};
