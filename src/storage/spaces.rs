//! DigitalOcean Spaces (S3-compatible) artifact store.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use super::{ArtifactStore, StorageError};
use crate::config::StorageConfig;

/// Artifact store writing public objects to a Spaces bucket.
///
/// Credentials come from the standard AWS chain (`AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY`).
pub struct SpacesArtifactStore {
    client: Client,
    bucket: String,
    endpoint_host: String,
    acl: ObjectCannedAcl,
}

impl std::fmt::Debug for SpacesArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpacesArtifactStore")
            .field("bucket", &self.bucket)
            .field("endpoint_host", &self.endpoint_host)
            .finish()
    }
}

/// Strip scheme and trailing slash from an endpoint setting.
pub fn endpoint_host(endpoint: &str) -> &str {
    endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

impl SpacesArtifactStore {
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(endpoint_host)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| StorageError::NotConfigured("DO_SPACES_ENDPOINT is not set".to_string()))?
            .to_string();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(format!("https://{}", endpoint))
            .build();

        debug!(
            "Spaces store ready: bucket={} endpoint={}",
            config.bucket, endpoint
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            endpoint_host: endpoint,
            acl: ObjectCannedAcl::from(config.acl.as_str()),
        })
    }
}

#[async_trait]
impl ArtifactStore for SpacesArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(self.acl.clone())
            .send()
            .await
            .map_err(|e| map_s3_error(e, key))?;

        info!("Uploaded {} bytes to {}/{}", size, self.bucket, key);
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://{}.{}/{}", self.bucket, self.endpoint_host, key)
    }
}

fn map_s3_error<E: std::fmt::Debug>(err: aws_sdk_s3::error::SdkError<E>, key: &str) -> StorageError {
    use aws_sdk_s3::error::SdkError;

    let message = match &err {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            format!("HTTP {}: {:?}", status, service_err.err())
        }
        SdkError::TimeoutError(_) => "timed out".to_string(),
        SdkError::DispatchFailure(_) => format!("connection error: {:?}", err),
        _ => format!("{:?}", err),
    };

    StorageError::Upload {
        key: key.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_host() {
        assert_eq!(endpoint_host("nyc3.digitaloceanspaces.com"), "nyc3.digitaloceanspaces.com");
        assert_eq!(
            endpoint_host("https://nyc3.digitaloceanspaces.com/"),
            "nyc3.digitaloceanspaces.com"
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_config_error() {
        let err = SpacesArtifactStore::from_config(&StorageConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_public_url() {
        let config = StorageConfig {
            endpoint: Some("https://nyc3.digitaloceanspaces.com".to_string()),
            ..Default::default()
        };
        let store = SpacesArtifactStore::from_config(&config).await.unwrap();
        assert_eq!(
            store.public_url("governo-pi/2025/04/a.pdf"),
            "https://radar-oficial-diarios-piaui.nyc3.digitaloceanspaces.com/governo-pi/2025/04/a.pdf"
        );
    }
}
