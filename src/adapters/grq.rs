//! GRQ catalog client: existence checks against the product Elasticsearch
//! indices and the dataset hand-off to the GRQ update service.

use crate::adapters::{build_client, ensure_success};
use crate::config::settings::GrqSettings;
use crate::utils::error::{IngestError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// `hits.total` is a bare number on older clusters and `{ "value": n }` on newer ones.
pub fn hit_total(response: &Value) -> u64 {
    match response.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

pub fn id_query(id: &str) -> Value {
    json!({
        "query": {"bool": {"must": [{"term": {"id.raw": id}}]}},
        "from": 0,
        "size": 1
    })
}

pub fn key_query(key: &str, short_name: &str) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [
                    {"query_string": {"default_field": "_all", "query": key}},
                    {"query_string": {"default_field": "metadata.short_name.raw", "query": short_name}}
                ],
                "must_not": [],
                "should": []
            }
        },
        "from": 0,
        "size": 1,
        "sort": [],
        "aggs": {}
    })
}

#[derive(Debug, Clone)]
pub struct GrqClient {
    client: Client,
    es_url: String,
    update_url: String,
}

impl GrqClient {
    pub fn new(settings: &GrqSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(None, settings.accept_invalid_certs)?,
            es_url: settings.es_url.trim_end_matches('/').to_string(),
            update_url: settings.update_url.clone(),
        })
    }

    pub fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.es_url, index)
    }

    /// `None` when the index answers with an error status (e.g. 404 on a fresh index).
    async fn search(&self, index: &str, query: &Value) -> Result<Option<Value>> {
        let url = self.search_url(index);
        tracing::debug!("querying: {} with {}", url, query);

        let response = self.client.post(&url).json(query).send().await?;
        if !response.status().is_success() {
            tracing::warn!(
                "GRQ search on {} returned {}, treating as not found",
                index,
                response.status()
            );
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    pub async fn count_by_id(&self, index: &str, id: &str) -> Result<u64> {
        let result = self.search(index, &id_query(id)).await?;
        Ok(result.as_ref().map(hit_total).unwrap_or(0))
    }

    pub async fn count_matching(&self, index: &str, key: &str, short_name: &str) -> Result<u64> {
        let result = self.search(index, &key_query(key, short_name)).await?;
        Ok(result.as_ref().map(hit_total).unwrap_or(0))
    }

    pub async fn first_match(
        &self,
        index: &str,
        key: &str,
        short_name: &str,
    ) -> Result<Option<SearchHit>> {
        let Some(result) = self.search(index, &key_query(key, short_name)).await? else {
            return Ok(None);
        };
        match result.pointer("/hits/hits/0") {
            Some(hit) => Ok(Some(serde_json::from_value(hit.clone())?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, index: &str, id: &str) -> Result<bool> {
        Ok(self.count_by_id(index, id).await? > 0)
    }

    /// Hands a product to GRQ for indexing as a form-encoded `dataset_info` document.
    pub async fn publish(&self, dataset_info: &Value) -> Result<()> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("dataset_info", &serde_json::to_string(dataset_info)?)
            .finish();

        let response = self
            .client
            .post(&self.update_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let response = ensure_success(response, "GRQ update")?;

        let text = response.text().await?;
        if let Ok(reply) = serde_json::from_str::<Value>(&text) {
            if reply.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(IngestError::processing(format!(
                    "GRQ rejected dataset: {}",
                    reply.get("message").unwrap_or(&reply)
                )));
            }
        }
        Ok(())
    }
}
