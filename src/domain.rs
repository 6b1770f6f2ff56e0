pub mod customer;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    error::Error,
    fmt::{Debug, Display},
    ops::Deref,
    str::FromStr,
};
use thiserror::Error;

pub trait Id:
    Copy
    + Eq
    + Deref<Target = Self::Inner>
    + From<Self::Inner>
    + Display
    + Debug
    + Send
    + Sync
    + Serialize
    + for<'de> Deserialize<'de>
{
    type Inner: FromStr;

    /// 新しい一意なIDを発行する
    fn generate() -> Self;
}

pub trait Entity: Debug + Clone + Send + Sync + Serialize + DeserializeOwned {
    type Id: Id;

    const ENTITY_NAME: &'static str;

    fn id(&self) -> Option<Self::Id>;
}

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Serialization error: {0}")]
    SerializationError(Box<dyn Error + Send + Sync>),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(Box<dyn Error + Send + Sync>),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Object already exists: {0}")]
    AlreadyExists(String),
    #[error("Entity has no identifier")]
    MissingId,
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for DataAccessError {
    fn from(value: serde_json::Error) -> Self {
        Self::SerializationError(Box::new(value))
    }
}

/// 一覧取得中に読み飛ばしたオブジェクト
#[derive(Debug)]
pub struct SkippedObject {
    pub key: String,
    pub reason: DataAccessError,
}

/// 一覧ストリームの要素
#[derive(Debug)]
pub enum Listed<E> {
    Entity(E),
    Skipped(SkippedObject),
}

/// 一覧取得結果
///
/// 個々のオブジェクトの失敗は一覧全体を失敗させず、`skipped` に記録される。
#[derive(Debug)]
pub struct Listing<E> {
    pub entities: Vec<E>,
    pub skipped: Vec<SkippedObject>,
}

impl<E> Listing<E> {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn push(&mut self, listed: Listed<E>) {
        match listed {
            Listed::Entity(entity) => self.entities.push(entity),
            Listed::Skipped(skipped) => self.skipped.push(skipped),
        }
    }
}

impl<E> Default for Listing<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> IntoIterator for Listing<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;
    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}
