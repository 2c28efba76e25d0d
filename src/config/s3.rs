use crate::utils::error::{IngestError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use std::path::{Path, PathBuf};

/// Pulls LPDAAC fulfillment emails delivered to an S3 bucket (SES inbound)
/// into the local email directory.
#[derive(Debug, Clone)]
pub struct S3EmailFetcher {
    client: S3Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3EmailFetcher {
    pub fn new(client: S3Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    pub async fn from_env(bucket: String, prefix: Option<String>) -> Result<Self> {
        validate_s3_bucket_name("s3_lpdaac_email_bucket", &bucket)?;
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Ok(Self::new(S3Client::new(&config), bucket, prefix))
    }

    /// Downloads every object not already present in `dest_dir`.
    pub async fn fetch_all(&self, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dest_dir)?;
        let mut fetched = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(prefix) = &self.prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let page = request.send().await.map_err(|e| IngestError::S3Error {
                message: format!("Failed to list s3://{}: {}", self.bucket, e),
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                if key.ends_with('/') {
                    continue;
                }
                let file_name = key.rsplit('/').next().unwrap_or(key);
                let dest = dest_dir.join(file_name);
                if dest.exists() {
                    continue;
                }

                let data = self.read_object(key).await?;
                std::fs::write(&dest, data)?;
                tracing::debug!("Fetched s3://{}/{} -> {}", self.bucket, key, dest.display());
                fetched.push(dest);
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated() == Some(true) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        tracing::info!(
            "📥 Fetched {} new emails from s3://{}",
            fetched.len(),
            self.bucket
        );
        Ok(fetched)
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::S3Error {
                message: format!("Failed to read s3://{}/{}: {}", self.bucket, key, e),
            })?;

        let data = resp.body.collect().await.map_err(|e| IngestError::S3Error {
            message: format!("Failed to collect s3://{}/{}: {}", self.bucket, key, e),
        })?;

        Ok(data.into_bytes().to_vec())
    }
}

pub fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    let invalid = |reason: &str| IngestError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: bucket_name.to_string(),
        reason: reason.to_string(),
    };

    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(invalid("S3 bucket name must be between 3 and 63 characters"));
    }
    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots",
        ));
    }
    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(invalid("S3 bucket name cannot start or end with a hyphen"));
    }
    Ok(())
}
