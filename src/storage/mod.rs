pub mod database;

pub use database::{init_database, load_snapshot, open_default, save_snapshot, Snapshot};
