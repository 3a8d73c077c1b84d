use crate::core::resolver::EndpointSelector;
use crate::core::{EndpointResolver, RemoteFetch, Result, ServiceEndpoint, UserId};
use crate::utils::error::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use url::Url;

pub const BOOKMARK_SERVICE: &str = "bookmark-service";
pub const CONTACT_SERVICE: &str = "contact-service";

/// 對單一下游服務發出 `GET /{userId}/{resource}` 並解碼 JSON 陣列。
///
/// 每次呼叫都重新解析端點，不做任何降級處理；錯誤交給 ResilientInvoker。
pub struct RemoteClient<T> {
    service_name: String,
    resource: String,
    resolver: Arc<dyn EndpointResolver>,
    selector: Arc<EndpointSelector>,
    client: Client,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RemoteClient<T> {
    pub fn new(
        service_name: impl Into<String>,
        resource: impl Into<String>,
        resolver: Arc<dyn EndpointResolver>,
        selector: Arc<EndpointSelector>,
        client: Client,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            resource: resource.into(),
            resolver,
            selector,
            client,
            _marker: PhantomData,
        }
    }

    /// 組出 `http://host:port/{userId}/{resource}`，userId 會做路徑編碼
    pub fn request_url(&self, endpoint: &ServiceEndpoint, user_id: &UserId) -> Result<Url> {
        let mut url = Url::parse(&endpoint.base_url()).map_err(|e| GatewayError::NetworkError {
            service: self.service_name.clone(),
            message: format!("invalid endpoint {}: {}", endpoint, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| GatewayError::NetworkError {
                service: self.service_name.clone(),
                message: format!("endpoint {} cannot be a base URL", endpoint),
            })?
            .clear()
            .push(user_id.as_str())
            .push(&self.resource);

        Ok(url)
    }

    async fn pick_endpoint(&self) -> Result<ServiceEndpoint> {
        let endpoints = self.resolver.resolve(&self.service_name).await?;
        self.selector
            .select(&endpoints)
            .cloned()
            .ok_or_else(|| GatewayError::NoEndpointsAvailable {
                service: self.service_name.clone(),
            })
    }
}

impl RemoteClient<crate::core::Bookmark> {
    pub fn bookmarks(
        resolver: Arc<dyn EndpointResolver>,
        selector: Arc<EndpointSelector>,
        client: Client,
    ) -> Self {
        Self::new(BOOKMARK_SERVICE, "bookmarks", resolver, selector, client)
    }
}

impl RemoteClient<crate::core::Contact> {
    pub fn contacts(
        resolver: Arc<dyn EndpointResolver>,
        selector: Arc<EndpointSelector>,
        client: Client,
    ) -> Self {
        Self::new(CONTACT_SERVICE, "contacts", resolver, selector, client)
    }
}

#[async_trait]
impl<T> RemoteFetch<T> for RemoteClient<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn service_name(&self) -> &str {
        &self.service_name
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Vec<T>> {
        let endpoint = self.pick_endpoint().await?;
        let url = self.request_url(&endpoint, user_id)?;

        tracing::debug!("Calling {} at {}", self.service_name, url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&self.service_name, e))?;

        let status = response.status();
        tracing::debug!("{} response status: {}", self.service_name, status);

        if !status.is_success() {
            return Err(GatewayError::RemoteStatusError {
                service: self.service_name.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::from_reqwest(&self.service_name, e))?;

        serde_json::from_slice::<Vec<T>>(&body).map_err(|e| GatewayError::DecodeError {
            service: self.service_name.clone(),
            message: e.to_string(),
        })
    }
}
