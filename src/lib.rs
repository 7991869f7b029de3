mod logger;

pub use logger::{init as init_logging, Logger};
pub mod events;
pub mod mappers;
pub mod model;
pub mod puppets;
pub mod scheduler;
pub mod speech;
pub mod syllables;

use std::collections::BTreeMap;

/// A mapping of various library metadata.
pub fn metadata() -> BTreeMap<&'static str, String> {
    let mut mapping = BTreeMap::new();

    let is_debug = cfg!(debug_assertions);
    mapping.insert("DEBUG", is_debug.to_string());
    mapping.insert("RELEASE", (!is_debug).to_string());

    mapping.insert("VERSION", env!("CARGO_PKG_VERSION").to_string());
    mapping.insert("VERSION_MAJOR", env!("CARGO_PKG_VERSION_MAJOR").to_string());
    mapping.insert("VERSION_MINOR", env!("CARGO_PKG_VERSION_MINOR").to_string());
    mapping.insert("VERSION_PATCH", env!("CARGO_PKG_VERSION_PATCH").to_string());

    mapping.insert("AUTHORS", env!("CARGO_PKG_AUTHORS").to_string());

    mapping
}
