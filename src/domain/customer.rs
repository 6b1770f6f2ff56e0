use std::str::FromStr;

use async_trait::async_trait;
use derive_more::{Deref, Display, Error, From};
use futures::{stream::BoxStream, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{DataAccessError, Entity, Id, Listed, Listing};

/// 顧客リポジトリ
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 顧客を登録し、そのIDを返す
    ///
    /// IDが未設定の場合は新たに発行して `customer` に設定する。
    /// 呼び出し側が指定したIDは、既に使われていない場合に限り受け付ける。
    async fn add(&self, customer: &mut Customer) -> Result<CustomerId, DataAccessError>;
    /// 顧客をIDで検索する
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, DataAccessError>;
    /// 既存の顧客を上書きする。存在しなければ何もせず `false` を返す
    async fn update(&self, customer: &Customer) -> Result<bool, DataAccessError>;
    /// 顧客を削除する。存在しないIDの削除はエラーにならない
    async fn remove(&self, id: CustomerId) -> Result<(), DataAccessError>;
    /// 全顧客を遅延ストリームとして列挙する
    fn stream(&self) -> BoxStream<'_, Result<Listed<Customer>, DataAccessError>>;

    /// 顧客をIDで取得する。存在しなければ `NotFound`
    async fn require(&self, id: CustomerId) -> Result<Customer, DataAccessError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DataAccessError::NotFound(id.to_string()))
    }

    /// 全顧客を取得する
    async fn list(&self) -> Result<Listing<Customer>, DataAccessError> {
        let mut listing = Listing::new();
        let mut stream = self.stream();
        while let Some(listed) = stream.try_next().await? {
            if let Listed::Skipped(skipped) = &listed {
                warn!(
                    entity = Customer::ENTITY_NAME,
                    key = %skipped.key,
                    "オブジェクトを読み飛ばしました: {}",
                    skipped.reason
                );
            }
            listing.push(listed);
        }
        Ok(listing)
    }
}

/// 顧客ID
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref)]
pub struct CustomerId(Uuid);

impl Id for CustomerId {
    type Inner = Uuid;

    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(CustomerId::from)
    }
}

/// 顧客エンティティ
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<CustomerId>,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

impl Customer {
    pub fn new(name: String) -> Result<Self, CustomerError> {
        Self::validate_name(&name)?;
        Ok(Self {
            name,
            ..Default::default()
        })
    }

    pub fn with_id(id: CustomerId, name: String) -> Result<Self, CustomerError> {
        let mut entity = Self::new(name)?;
        entity.id = Some(id);
        Ok(entity)
    }

    pub fn change_name(&mut self, name: String) -> Result<(), CustomerError> {
        Self::validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn change_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    pub fn change_phone(&mut self, phone: Option<String>) {
        self.phone = phone;
    }

    pub fn change_address(&mut self, address: Option<String>) {
        self.address = address;
    }

    pub fn name(&self) -> &String {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub(crate) fn assign_id(&mut self, id: CustomerId) {
        self.id = Some(id);
    }

    fn validate_name(name: &str) -> Result<(), CustomerError> {
        match name.trim().is_empty() {
            true => Err(CustomerError::NameIsBlank),
            false => Ok(()),
        }
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    const ENTITY_NAME: &'static str = "customer";

    fn id(&self) -> Option<Self::Id> {
        self.id
    }
}

/// 顧客エラー
#[derive(Error, Display, Debug)]
pub enum CustomerError {
    /// 名前が空欄です
    #[display(fmt = "Name cannot be blank")]
    NameIsBlank,
}
