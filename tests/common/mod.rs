#![allow(dead_code)]

use ava_ingest::domain::ports::{BrowseRenderer, Localizer};
use ava_ingest::Result;
use ava_ingest::Settings;
use async_trait::async_trait;
use httpmock::MockServer;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Settings pointing every service at one mock server.
pub fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.grq.es_url = server.base_url();
    settings.grq.update_url = server.url("/api/v0.1/grq/dataset/index");
    settings.mozart.rest_url = server.url("/mozart/api/v0.1");
    settings.mozart.jobs_es_url = server.base_url();
    settings.ava.url = server.base_url();
    settings.cmr.url = server.base_url();
    settings.cmr.retry_delay_seconds = 0;
    settings
}

/// Stands in for wget: files get the URL as content, listings get `listing_files`.
#[derive(Clone, Default)]
pub struct RecordingLocalizer {
    pub fetched: Arc<Mutex<Vec<String>>>,
    pub listing_files: Vec<String>,
}

#[async_trait]
impl Localizer for RecordingLocalizer {
    async fn fetch_file(&self, url: &str, dest: &Path) -> Result<()> {
        std::fs::write(dest, url)?;
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn fetch_listing(&self, url: &str, _suffix: &str, dest_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dest_dir)?;
        for name in &self.listing_files {
            std::fs::write(dest_dir.join(name), "")?;
        }
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct CopyRenderer;

#[async_trait]
impl BrowseRenderer for CopyRenderer {
    async fn render(&self, source: &Path, browse: &Path, browse_small: &Path) -> Result<()> {
        std::fs::copy(source, browse)?;
        std::fs::copy(source, browse_small)?;
        Ok(())
    }
}
