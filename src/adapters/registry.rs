use crate::domain::model::ServiceEndpoint;
use crate::domain::ports::EndpointResolver;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

const REGISTRY: &str = "registry";

/// 向外部服務註冊中心查詢實例：`GET {registry}/services/{name}`。
///
/// 回應為 `[{"host": "...", "port": 8081}]`；404 代表沒有註冊實例。
#[derive(Debug, Clone)]
pub struct HttpRegistryResolver {
    base_url: Url,
    client: Client,
}

impl HttpRegistryResolver {
    pub fn new(registry_endpoint: &str, client: Client) -> Result<Self> {
        let base_url =
            Url::parse(registry_endpoint).map_err(|e| GatewayError::InvalidConfigValueError {
                field: "registry.endpoint".to_string(),
                value: registry_endpoint.to_string(),
                reason: format!("Invalid URL format: {}", e),
            })?;

        Ok(Self { base_url, client })
    }

    pub fn lookup_url(&self, service_name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::ConfigError {
                message: format!("registry endpoint {} cannot be a base URL", self.base_url),
            })?
            .pop_if_empty()
            .push("services")
            .push(service_name);
        Ok(url)
    }
}

#[async_trait]
impl EndpointResolver for HttpRegistryResolver {
    async fn resolve(&self, service_name: &str) -> Result<Vec<ServiceEndpoint>> {
        let url = self.lookup_url(service_name)?;
        tracing::debug!("Looking up {} in registry: {}", service_name, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(REGISTRY, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("Registry has no instances of {}", service_name);
                Ok(Vec::new())
            }
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::from_reqwest(REGISTRY, e))?;
                let endpoints: Vec<ServiceEndpoint> =
                    serde_json::from_slice(&body).map_err(|e| GatewayError::DecodeError {
                        service: REGISTRY.to_string(),
                        message: e.to_string(),
                    })?;
                tracing::debug!(
                    "Registry returned {} instance(s) of {}",
                    endpoints.len(),
                    service_name
                );
                Ok(endpoints)
            }
            status => Err(GatewayError::RemoteStatusError {
                service: REGISTRY.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}
