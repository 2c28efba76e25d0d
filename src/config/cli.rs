use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Product directories live directly under the run's work directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.base_path.join(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        let full_path = self.base_path.join(path);
        if full_path.exists() {
            fs::remove_dir_all(full_path)?;
        }
        Ok(())
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

#[cfg(feature = "cli")]
pub use args::CommonArgs;

#[cfg(feature = "cli")]
mod args {
    use crate::config::context::CONTEXT_FILE;
    use crate::config::settings::{Settings, CONFIG_ENV_VAR};
    use crate::utils::error::Result;
    use crate::utils::logger;
    use clap::Args;
    use std::path::PathBuf;

    /// Flags every procedure accepts.
    #[derive(Debug, Clone, Args)]
    pub struct CommonArgs {
        /// Settings file (TOML)
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        pub config: Option<PathBuf>,

        /// Job context file
        #[arg(long, default_value = CONTEXT_FILE)]
        pub context: PathBuf,

        /// Directory products are written to
        #[arg(short, long, default_value = ".")]
        pub work_dir: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        pub verbose: bool,

        /// Log process CPU and memory per phase
        #[arg(long)]
        pub monitor: bool,

        /// Append a copy of the log to this file
        #[arg(long)]
        pub log_file: Option<PathBuf>,

        /// Emit JSON log lines instead of the compact console format
        #[arg(long)]
        pub log_json: bool,
    }

    impl CommonArgs {
        pub fn init_logging(&self, default_log_file: Option<&str>) -> Result<()> {
            if self.log_json {
                logger::init_json_logger(self.verbose);
                return Ok(());
            }
            let log_file = self
                .log_file
                .clone()
                .or_else(|| default_log_file.map(|name| self.work_dir.join(name)));
            logger::init_cli_logger(self.verbose, log_file.as_deref())
        }

        pub fn settings(&self) -> Result<Settings> {
            Settings::load(self.config.as_deref())
        }

        /// Relative context paths are resolved against the work directory.
        pub fn context_path(&self) -> PathBuf {
            if self.context.is_absolute() {
                self.context.clone()
            } else {
                self.work_dir.join(&self.context)
            }
        }
    }
}
