use crate::domain::model::LoadSummary;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Files relative to the run's work directory.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_dir(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn full_path(&self, path: &str) -> std::path::PathBuf;
}

/// Downloads remote files into the work directory.
#[async_trait]
pub trait Localizer: Send + Sync {
    /// Fetches `url` into `dest`; `dest` must exist afterwards.
    async fn fetch_file(&self, url: &str, dest: &Path) -> Result<()>;

    /// Mirrors every file ending in `suffix` linked from the index at `url` into `dest_dir`.
    async fn fetch_listing(&self, url: &str, suffix: &str, dest_dir: &Path) -> Result<()>;
}

#[async_trait]
pub trait BrowseRenderer: Send + Sync {
    async fn render(&self, source: &Path, browse: &Path, browse_small: &Path) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Record: Send + 'static;
    type Staged: Send + 'static;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Vec<Self::Record>>;
    async fn transform(&self, records: Vec<Self::Record>) -> Result<Vec<Self::Staged>>;
    async fn load(&self, staged: Vec<Self::Staged>) -> Result<LoadSummary>;
}
