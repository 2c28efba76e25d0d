// Adapters layer: clients for the external services and tools the procedures call.

pub mod ava;
pub mod cmr;
pub mod command;
pub mod grq;
pub mod mozart;

use crate::utils::error::{IngestError, Result};
use reqwest::{Client, Response};
use std::time::Duration;

pub(crate) fn build_client(timeout_seconds: Option<u64>, accept_invalid_certs: bool) -> Result<Client> {
    let mut builder = Client::builder().danger_accept_invalid_certs(accept_invalid_certs);
    if let Some(secs) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

pub(crate) fn ensure_success(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(IngestError::UpstreamStatus {
        service: service.to_string(),
        status: status.as_u16(),
        url: response.url().to_string(),
    })
}
