//! S3 / S3-compatible artifact store.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use hc_core::config::StoreConfig;

use crate::ArtifactStore;

/// [`ArtifactStore`] backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
}

impl S3ArtifactStore {
    /// Build a client from the store config.
    ///
    /// Explicit credentials are used when both halves are configured;
    /// otherwise the AWS default provider chain applies. A custom endpoint
    /// switches to path-style addressing (required by MinIO).
    pub async fn from_config(cfg: &StoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));

        if let (Some(id), Some(secret)) = (&cfg.access_key_id, &cfg.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "hlscache-config",
            ));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = cfg.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn exists(&self, bucket: &str, key: &str) -> hc_core::Result<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found)
                {
                    Ok(false)
                } else {
                    Err(hc_core::Error::Store(format!(
                        "head {bucket}/{key}: {}",
                        DisplayErrorContext(&err)
                    )))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &Path,
        content_type: &str,
    ) -> hc_core::Result<()> {
        let stream = ByteStream::from_path(body).await.map_err(|e| {
            hc_core::Error::Store(format!("failed to read {}: {e}", body.display()))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                hc_core::Error::Store(format!("put {bucket}/{key}: {}", DisplayErrorContext(&e)))
            })?;

        Ok(())
    }
}
