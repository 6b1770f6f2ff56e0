use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_object::DeleteObjectError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::operation::put_object::PutObjectError;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    pub next_continuation: Option<String>,
}

/// オブジェクトストレージ
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ObjectStorageError>;

    /// 存在しないオブジェクトは `Ok(None)`
    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, ObjectStorageError>;

    /// 存在しないオブジェクトの削除は成功扱い
    async fn delete_object(&self, key: &str) -> Result<(), ObjectStorageError>;

    async fn list_objects(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, ObjectStorageError>;
}

#[derive(Error, Debug)]
pub enum ObjectStorageError {
    #[error("Failed to put object: {0}")]
    PutObject(#[from] SdkError<PutObjectError>),
    #[error("Failed to get object: {0}")]
    GetObject(#[from] SdkError<GetObjectError>),
    #[error("Failed to delete object: {0}")]
    DeleteObject(#[from] SdkError<DeleteObjectError>),
    #[error("Failed to list objects: {0}")]
    ListObjects(#[from] SdkError<ListObjectsV2Error>),
    #[error("Failed to stream object: {0}")]
    ObjectStream(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}
