//! S3 client built on `aws-sdk-s3`.
//!
//! Objects are streamed between the SDK and local files; nothing is buffered
//! whole in memory. Transfer options use the SDK's parameter names, for
//! example `RequestPayer=requester` or `ContentType=text/plain`. Unknown
//! names are logged and ignored.

use crate::backend::{ObjectClient, ObjectStoreBackend, SharedClient, TransferOptions};
use crate::config::StoreConfig;
use crate::error::BoxError;
use crate::pool::HandleFactory;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, RequestPayer, ServerSideEncryption, StorageClass};
use aws_sdk_s3::Client;
use futures::FutureExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Scheme the S3 backend is registered under.
pub const S3_SCHEME: &str = "s3";

#[derive(Debug, Clone)]
pub struct S3ObjectClient {
    client: Client,
}

impl S3ObjectClient {
    /// Build a client for the configured region and optional endpoint
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if config.endpoint.is_some() {
            builder = builder.force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn sdk_error<E>(error: E) -> BoxError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DisplayErrorContext(error).to_string().into()
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> Result<(), BoxError> {
        let body = ByteStream::from_path(local).await.map_err(sdk_error)?;
        let mut request = self.client.put_object().bucket(bucket).key(key).body(body);
        for (name, value) in options {
            request = match name.as_str() {
                "RequestPayer" => request.request_payer(RequestPayer::from(value.as_str())),
                "ACL" => request.acl(ObjectCannedAcl::from(value.as_str())),
                "ContentType" => request.content_type(value),
                "ContentEncoding" => request.content_encoding(value),
                "CacheControl" => request.cache_control(value),
                "StorageClass" => request.storage_class(StorageClass::from(value.as_str())),
                "ServerSideEncryption" => {
                    request.server_side_encryption(ServerSideEncryption::from(value.as_str()))
                }
                _ => {
                    log::warn!("ignoring unsupported upload option {name}");
                    request
                }
            };
        }
        request.send().await.map_err(sdk_error)?;
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> Result<(), BoxError> {
        let mut request = self.client.get_object().bucket(bucket).key(key);
        for (name, value) in options {
            request = match name.as_str() {
                "RequestPayer" => request.request_payer(RequestPayer::from(value.as_str())),
                "VersionId" => request.version_id(value),
                _ => {
                    log::warn!("ignoring unsupported download option {name}");
                    request
                }
            };
        }
        let output = request.send().await.map_err(sdk_error)?;

        // Stream into a sibling temp file so `local` only ever holds a complete body.
        let parent = local
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let (file, partial) = tempfile::NamedTempFile::new_in(parent)?.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut body = output.body.into_async_read();
        tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;
        drop(file);
        partial.persist(local)?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BoxError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

/// Pooled backend that builds one S3 client per pool slot
pub fn s3_backend(config: &StoreConfig) -> ObjectStoreBackend {
    let shared_config = Arc::new(config.clone());
    let factory: HandleFactory<SharedClient> = Arc::new(move || {
        let config = Arc::clone(&shared_config);
        async move {
            let client: SharedClient = Arc::new(S3ObjectClient::connect(&config).await);
            Ok(client)
        }
        .boxed()
    });
    ObjectStoreBackend::new(factory, config.pool_size)
}
