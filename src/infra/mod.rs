pub mod db;
pub mod memory;
pub mod store;

pub use store::{SharedStore, Store};
