//! JSON-snapshot backend for the Lobby document store.
//!
//! Every table lives in memory and is mirrored to one pretty-printed
//! `<table>.json` file under the store's root directory. Each successful
//! mutation rewrites that file in full before returning.

mod persist;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use persist::{Loaded, TableFiles};
pub use store::JsonStore;
