pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CommonArgs;
pub use config::{LocalStorage, Settings};

pub use core::etl::IngestEngine;
pub use utils::error::{IngestError, Result};
