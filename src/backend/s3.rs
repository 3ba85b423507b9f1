//! S3 uploads with static credentials.

use super::ObjectStore;
use crate::config::S3Config;
use crate::error::AssetError;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

/// Uploads into one bucket. Keys arrive fully formed (prefix included).
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Build the client once from config; it is read-only afterwards.
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "notes2story-static",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(ref endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), AssetError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AssetError::Upload {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;
        debug!("Uploaded {} bytes to s3://{}/{}", len, self.bucket, key);
        Ok(())
    }
}
