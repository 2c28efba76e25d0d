//! Mozart job-system client: job-status lookups and job submission.

use crate::adapters::{build_client, ensure_success, grq::hit_total};
use crate::config::settings::MozartSettings;
use crate::domain::model::JobRequest;
use crate::utils::error::{IngestError, Result};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

pub const JOB_STATUS_INDEX: &str = "job_status-current";

/// `a,b` -> `"a","b"`, the inner part of Mozart's tag list.
pub fn format_job_tags(tag_string: &str) -> String {
    if tag_string.trim().is_empty() {
        return String::new();
    }
    tag_string
        .split(',')
        .map(|tag| format!("\"{}\"", tag))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn active_job_query(uid: &str) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [{"query_string": {"default_field": "_all", "query": uid}}],
                "must_not": [{"query_string": {"default_field": "status", "query": "job-failed"}}],
                "should": []
            }
        },
        "from": 0,
        "size": 10,
        "sort": [],
        "aggs": {}
    })
}

#[derive(Debug, Clone)]
pub struct MozartClient {
    client: Client,
    rest_url: String,
    jobs_es_url: String,
}

impl MozartClient {
    pub fn new(settings: &MozartSettings, accept_invalid_certs: bool) -> Result<Self> {
        Ok(Self {
            client: build_client(None, accept_invalid_certs)?,
            rest_url: settings.rest_url.trim_end_matches('/').to_string(),
            jobs_es_url: settings.jobs_es_url.trim_end_matches('/').to_string(),
        })
    }

    /// Jobs mentioning `uid` that are queued, running or completed.
    pub async fn active_job_count(&self, uid: &str) -> Result<u64> {
        let url = format!("{}/{}/_search", self.jobs_es_url, JOB_STATUS_INDEX);
        let query = active_job_query(uid);
        tracing::debug!("querying: {} with {}", url, query);

        let response = self.client.post(&url).json(&query).send().await?;
        if !response.status().is_success() {
            tracing::warn!("job status search returned {}, treating as no jobs", response.status());
            return Ok(0);
        }
        let body: Value = response.json().await?;
        Ok(hit_total(&body))
    }

    pub fn submit_url(&self, job: &JobRequest) -> Result<Url> {
        let params = [
            ("queue", job.queue.clone()),
            ("priority", job.priority.to_string()),
            ("tags", format!("[{}]", format_job_tags(&job.tags.join(",")))),
            ("type", job.job_type()),
            ("params", serde_json::to_string(&job.params)?),
            ("enable_dedup", "true".to_string()),
        ];
        let base = format!("{}/job/submit", self.rest_url);
        Url::parse_with_params(&base, &params).map_err(|e| IngestError::InvalidConfigValueError {
            field: "mozart.rest_url".to_string(),
            value: base.clone(),
            reason: e.to_string(),
        })
    }

    /// Returns the Mozart job id.
    pub async fn submit(&self, job: &JobRequest) -> Result<String> {
        let url = self.submit_url(job)?;
        tracing::info!("submitting {} with params: {}", job.job_type(), job.params);

        let response = self.client.post(url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            tracing::error!("submission job failed");
            ensure_success(response, "Mozart")?;
            return Err(IngestError::JobSubmissionError {
                job_type: job.job_type(),
                message: "unexpected non-200 success status".to_string(),
            });
        }

        let result: Value = response.json().await?;
        let job_id = match (result.get("success"), result.get("result")) {
            (Some(Value::Bool(true)), Some(Value::String(id))) => id.clone(),
            (Some(Value::Bool(true)), Some(other)) => other.to_string(),
            _ => {
                return Err(IngestError::JobSubmissionError {
                    job_type: job.job_type(),
                    message: result.to_string(),
                })
            }
        };

        tracing::info!(
            "submitted {} job version: {} job_id: {}",
            job.job_name,
            job.job_version,
            job_id
        );
        Ok(job_id)
    }
}
