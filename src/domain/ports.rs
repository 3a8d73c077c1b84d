use crate::domain::model::{ServiceEndpoint, UserId};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 將邏輯服務名稱解析為目前可用的網路位址。
///
/// 沒有註冊實例時回傳空序列而不是錯誤；只有查詢本身失敗才回傳 `Err`。
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, service_name: &str) -> Result<Vec<ServiceEndpoint>>;
}

/// 針對單一下游服務取得使用者資料
#[async_trait]
pub trait RemoteFetch<T>: Send + Sync {
    fn service_name(&self) -> &str;

    async fn fetch(&self, user_id: &UserId) -> Result<Vec<T>>;
}
