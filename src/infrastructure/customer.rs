use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::customer::{Customer, CustomerId, CustomerRepository};
use crate::domain::{DataAccessError, Entity, Id, Listed, SkippedObject};
use crate::infrastructure::object_storage::{ObjectPage, ObjectStorage, ObjectStorageError};
use crate::infrastructure::{decode, encode, entity_id, key_prefix, object_key};
use crate::Storage;

/// オブジェクトストレージ顧客リポジトリ
#[derive(Clone)]
pub struct ObjectStoreCustomerRepository {
    storage: Arc<dyn ObjectStorage>,
    prefix: String,
    timeout: Duration,
    cancellation: CancellationToken,
}

impl ObjectStoreCustomerRepository {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &Storage) -> Self {
        Self {
            storage,
            prefix: key_prefix(&config.prefix),
            timeout: config.timeout(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, id: CustomerId) -> String {
        object_key::<Customer>(&self.prefix, id)
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ObjectStorageError>>,
    ) -> Result<T, DataAccessError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(DataAccessError::Cancelled),
            result = tokio::time::timeout(self.timeout, request) => match result {
                Ok(result) => Ok(result?),
                Err(_) => Err(ObjectStorageError::Timeout(self.timeout).into()),
            },
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, DataAccessError> {
        Ok(self.call(self.storage.get_object(key)).await?.is_some())
    }

    async fn write(&self, key: &str, customer: &Customer) -> Result<(), DataAccessError> {
        let data = encode(customer)?;
        self.call(self.storage.put_object(key, data)).await
    }

    async fn list_page(&self, continuation: Option<String>) -> Result<ObjectPage, DataAccessError> {
        let page = self
            .call(self.storage.list_objects(&self.prefix, continuation))
            .await?;
        debug!(
            entity = Customer::ENTITY_NAME,
            keys = page.keys.len(),
            last = page.next_continuation.is_none(),
            "キー一覧ページを取得しました"
        );
        Ok(page)
    }

    async fn materialize(&self, key: String) -> Result<Listed<Customer>, DataAccessError> {
        let id = match entity_id::<CustomerId>(&self.prefix, &key) {
            Ok(id) => id,
            Err(reason) => return Ok(Listed::Skipped(SkippedObject { key, reason })),
        };
        match self.find_by_id(id).await {
            Ok(Some(entity)) => Ok(Listed::Entity(entity)),
            Ok(None) => Ok(Listed::Skipped(SkippedObject {
                reason: DataAccessError::NotFound(key.clone()),
                key,
            })),
            Err(DataAccessError::Cancelled) => Err(DataAccessError::Cancelled),
            Err(reason) => Ok(Listed::Skipped(SkippedObject { key, reason })),
        }
    }
}

#[async_trait]
impl CustomerRepository for ObjectStoreCustomerRepository {
    async fn add(&self, customer: &mut Customer) -> Result<CustomerId, DataAccessError> {
        let id = match customer.id() {
            Some(id) => {
                let key = self.key(id);
                if self.exists(&key).await? {
                    return Err(DataAccessError::AlreadyExists(key));
                }
                id
            }
            None => CustomerId::generate(),
        };
        let key = self.key(id);
        let mut entity = customer.clone();
        entity.assign_id(id);
        self.write(&key, &entity).await?;
        *customer = entity;
        debug!(entity = Customer::ENTITY_NAME, %key, "顧客を登録しました");
        Ok(id)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError> {
        let key = self.key(id);
        let Some(data) = self.call(self.storage.get_object(&key)).await? else {
            return Ok(None);
        };
        let mut customer: Customer = decode(&data)?;
        // キーのIDと本文のIDは一致しなければならない
        match customer.id() {
            Some(stored) if stored != id => {
                return Err(DataAccessError::SerializationError(
                    format!("object {key} holds id {stored}").into(),
                ));
            }
            Some(_) => {}
            None => customer.assign_id(id),
        }
        Ok(Some(customer))
    }

    async fn update(&self, customer: &Customer) -> Result<bool, DataAccessError> {
        let id = customer.id().ok_or(DataAccessError::MissingId)?;
        let key = self.key(id);
        if !self.exists(&key).await? {
            debug!(entity = Customer::ENTITY_NAME, %key, "未登録の顧客は更新しません");
            return Ok(false);
        }
        self.write(&key, customer).await?;
        debug!(entity = Customer::ENTITY_NAME, %key, "顧客を更新しました");
        Ok(true)
    }

    async fn remove(&self, id: CustomerId) -> Result<(), DataAccessError> {
        let key = self.key(id);
        self.call(self.storage.delete_object(&key)).await?;
        debug!(entity = Customer::ENTITY_NAME, %key, "顧客を削除しました");
        Ok(())
    }

    fn stream(&self) -> BoxStream<'_, Result<Listed<Customer>, DataAccessError>> {
        stream::try_unfold(Some(None), move |state: Option<Option<String>>| async move {
            match state {
                Some(continuation) => self
                    .list_page(continuation)
                    .await
                    .map(|page| Some((page.keys, page.next_continuation.map(Some)))),
                None => Ok(None),
            }
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, DataAccessError>)))
        .try_flatten()
        .try_filter(move |key| future::ready(*key != self.prefix))
        .and_then(move |key| self.materialize(key))
        .boxed()
    }
}
