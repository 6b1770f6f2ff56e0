use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::infrastructure::object_storage::{ObjectPage, ObjectStorage, ObjectStorageError};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// インメモリのオブジェクトストレージ
///
/// 継続トークンは直前のページの最後のキー。
#[derive(Debug)]
pub struct MemoryObjectStorage {
    objects: RwLock<BTreeMap<String, Bytes>>,
    page_size: usize,
    unavailable: AtomicBool,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.write().insert(key.into(), data.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn check(&self) -> Result<(), ObjectStorageError> {
        match self.unavailable.load(Ordering::SeqCst) {
            true => Err(ObjectStorageError::Unavailable(
                "memory storage is offline".to_owned(),
            )),
            false => Ok(()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Bytes>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), ObjectStorageError> {
        self.check()?;
        self.write().insert(key.to_owned(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, ObjectStorageError> {
        self.check()?;
        Ok(self.read().get(key).cloned())
    }

    async fn delete_object(&self, key: &str) -> Result<(), ObjectStorageError> {
        self.check()?;
        self.write().remove(key);
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, ObjectStorageError> {
        self.check()?;
        let objects = self.read();
        let mut keys = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.as_deref().map_or(true, |after| key.as_str() > after))
            .take(self.page_size + 1)
            .cloned()
            .collect::<Vec<_>>();
        let next_continuation = match keys.len() > self.page_size {
            true => {
                keys.truncate(self.page_size);
                keys.last().cloned()
            }
            false => None,
        };
        Ok(ObjectPage {
            keys,
            next_continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = MemoryObjectStorage::new();
        storage
            .put_object("a/1", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(
            storage.get_object("a/1").await.unwrap(),
            Some(Bytes::from_static(b"one"))
        );
        assert_eq!(storage.get_object("a/2").await.unwrap(), None);

        storage.delete_object("a/1").await.unwrap();
        storage.delete_object("a/1").await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_list_pages() {
        let storage = MemoryObjectStorage::with_page_size(2);
        for key in ["a/1", "a/2", "a/3", "b/1", "a/4", "a/5"] {
            storage.insert_raw(key, "x");
        }

        let first = storage.list_objects("a/", None).await.unwrap();
        assert_eq!(first.keys, vec!["a/1", "a/2"]);
        assert_eq!(first.next_continuation.as_deref(), Some("a/2"));

        let second = storage
            .list_objects("a/", first.next_continuation)
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["a/3", "a/4"]);

        let third = storage
            .list_objects("a/", second.next_continuation)
            .await
            .unwrap();
        assert_eq!(third.keys, vec!["a/5"]);
        assert_eq!(third.next_continuation, None);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let storage = MemoryObjectStorage::new();
        storage.set_unavailable(true);
        assert!(matches!(
            storage.get_object("a/1").await,
            Err(ObjectStorageError::Unavailable(_))
        ));
        assert!(storage.list_objects("a/", None).await.is_err());

        storage.set_unavailable(false);
        assert_eq!(storage.get_object("a/1").await.unwrap(), None);
    }
}
