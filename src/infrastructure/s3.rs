use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::infrastructure::object_storage::{ObjectPage, ObjectStorage, ObjectStorageError};
use crate::Storage;

/// S3互換ストレージ
#[derive(Clone, Debug)]
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(config: &Storage) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "pizzeria",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .force_path_style(true)
            .build();
        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ObjectStorageError> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type("application/json")
            .send()
            .await?;
        debug!(bucket = %self.bucket, key, bytes = len, "オブジェクトを保存しました");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, ObjectStorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().map_or(false, |e| e.is_no_such_key()) => {
                debug!(bucket = %self.bucket, key, "オブジェクトが存在しません");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStorageError::ObjectStream(e.to_string()))?
            .into_bytes();
        debug!(bucket = %self.bucket, key, bytes = data.len(), "オブジェクトを取得しました");
        Ok(Some(data))
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        debug!(bucket = %self.bucket, key, "オブジェクトを削除しました");
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, ObjectStorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation)
            .send()
            .await?;
        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let next_continuation = match output.is_truncated() {
            Some(true) => output.next_continuation_token().map(str::to_owned),
            _ => None,
        };
        debug!(
            bucket = %self.bucket,
            prefix,
            keys = keys.len(),
            truncated = next_continuation.is_some(),
            "オブジェクト一覧を取得しました"
        );
        Ok(ObjectPage {
            keys,
            next_continuation,
        })
    }
}
