use crate::adapters::mozart::MozartClient;
use crate::config::settings::LpdaacJobSettings;
use crate::config::Settings;
use crate::core::email::{list_email_files, scrape_email_file, LpdaacOrder};
use crate::core::{LoadSummary, Pipeline};
use crate::domain::model::JobRequest;
use crate::utils::error::Result;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;

/// Submits one `ingest_lpdaac_prod` job per order found in the fulfillment emails.
pub struct EmailPipeline {
    pub(crate) directory: PathBuf,
    pub(crate) mozart: MozartClient,
    pub(crate) jobs: LpdaacJobSettings,
    pub(crate) tag_date: String,
}

impl EmailPipeline {
    pub fn new(directory: impl Into<PathBuf>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            directory: directory.into(),
            mozart: MozartClient::new(&settings.mozart, settings.grq.accept_invalid_certs)?,
            jobs: settings.lpdaac_jobs.clone(),
            tag_date: chrono::Local::now().format("%Y%m%d").to_string(),
        })
    }

    /// Fixes the date prefix of job tags.
    pub fn with_tag_date(mut self, tag_date: impl Into<String>) -> Self {
        self.tag_date = tag_date.into();
        self
    }

    pub fn job_for(&self, order: &LpdaacOrder) -> JobRequest {
        JobRequest {
            job_name: self.jobs.job_name.clone(),
            job_version: self.jobs.job_version.clone(),
            queue: self.jobs.queue.clone(),
            priority: self.jobs.priority,
            tags: vec![format!("{}-ingest_from_lpdaac-id-{}", self.tag_date, order.order_id)],
            params: json!({"lpdaac_download_url": order.download_url}),
        }
    }
}

#[async_trait::async_trait]
impl Pipeline for EmailPipeline {
    type Record = LpdaacOrder;
    type Staged = JobRequest;

    fn name(&self) -> &str {
        "ingest_from_lpdaac_emails"
    }

    async fn extract(&self) -> Result<Vec<LpdaacOrder>> {
        tracing::info!("lpdaac_email_directory: {}", self.directory.display());
        let mut seen = HashSet::new();
        let mut orders = Vec::new();

        for email in list_email_files(&self.directory)? {
            match scrape_email_file(&email)? {
                Some(order) => {
                    if seen.insert(order.order_id.clone()) {
                        orders.push(order);
                    } else {
                        tracing::debug!("order {} repeated in {}", order.order_id, email.display());
                    }
                }
                None => tracing::warn!(
                    "could not find ORDERID and Download Links in email: {}",
                    email.display()
                ),
            }
        }
        Ok(orders)
    }

    async fn transform(&self, records: Vec<LpdaacOrder>) -> Result<Vec<JobRequest>> {
        let mut jobs = Vec::new();
        tracing::info!("ORDER_ID, LPDAAC_DOWNLOAD_LINK");

        for order in records {
            // 已排隊或已完成的訂單不再送出
            let active = self.mozart.active_job_count(&order.order_id).await?;
            if active != 0 {
                tracing::debug!("order {} already has {} jobs", order.order_id, active);
                continue;
            }
            tracing::info!("{}, {}", order.order_id, order.download_url);
            jobs.push(self.job_for(&order));
        }
        Ok(jobs)
    }

    async fn load(&self, staged: Vec<JobRequest>) -> Result<LoadSummary> {
        let mut job_ids = Vec::new();
        for job in &staged {
            job_ids.push(self.mozart.submit(job).await?);
        }
        Ok(LoadSummary {
            loaded: job_ids.len(),
            output: format!("job ids [{}]", job_ids.join(", ")),
        })
    }
}
