pub mod cli;
pub mod context;
#[cfg(feature = "s3")]
pub mod s3;
pub mod settings;

pub use cli::LocalStorage;
pub use settings::Settings;
