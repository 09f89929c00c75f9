pub mod bootstrap;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod syncer;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use service::SyncEngine;
pub use syncer::Syncer;
