pub mod customer;
pub mod memory;
pub mod object_storage;
pub mod s3;

use bytes::Bytes;

use crate::domain::{DataAccessError, Entity, Id};

use self::object_storage::ObjectStorageError;

impl From<ObjectStorageError> for DataAccessError {
    fn from(value: ObjectStorageError) -> Self {
        Self::StorageUnavailable(Box::new(value))
    }
}

/// 設定されたプレフィックスを `/` 終端の形式に揃える
fn key_prefix(prefix: &str) -> String {
    prefix.trim_end_matches('/').to_owned() + "/"
}

fn object_key<E: Entity>(prefix: &str, id: E::Id) -> String {
    prefix.to_owned() + &id.to_string()
}

/// オブジェクトキーからIDを取り出す。[`object_key`] が書く正規形のみ受け付ける
fn entity_id<I: Id>(prefix: &str, key: &str) -> Result<I, DataAccessError> {
    key.strip_prefix(prefix)
        .and_then(|suffix| {
            suffix
                .parse::<I::Inner>()
                .ok()
                .map(I::from)
                .filter(|id| id.to_string() == suffix)
        })
        .ok_or_else(|| DataAccessError::InvalidKey(key.to_owned()))
}

fn encode<E: Entity>(entity: &E) -> Result<Bytes, DataAccessError> {
    Ok(serde_json::to_vec(entity)?.into())
}

fn decode<E: Entity>(data: &[u8]) -> Result<E, DataAccessError> {
    Ok(serde_json::from_slice(data)?)
}
