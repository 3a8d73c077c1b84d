use crate::core::{EndpointResolver, Result, ServiceEndpoint};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 以固定實例表回應的解析器（設定檔的 `registry.instances` 或測試用）
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    instances: HashMap<String, Vec<ServiceEndpoint>>,
}

impl StaticResolver {
    pub fn new(instances: HashMap<String, Vec<ServiceEndpoint>>) -> Self {
        Self { instances }
    }

    pub fn with_service(mut self, service_name: &str, endpoints: Vec<ServiceEndpoint>) -> Self {
        self.instances.insert(service_name.to_string(), endpoints);
        self
    }
}

#[async_trait]
impl EndpointResolver for StaticResolver {
    async fn resolve(&self, service_name: &str) -> Result<Vec<ServiceEndpoint>> {
        Ok(self
            .instances
            .get(service_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    #[default]
    First,
    RoundRobin,
    Random,
}

/// 在多個實例之間挑選一個；游標只在 RoundRobin 時使用
#[derive(Debug, Default)]
pub struct EndpointSelector {
    strategy: SelectionStrategy,
    cursor: AtomicUsize,
}

impl EndpointSelector {
    pub fn new(strategy: SelectionStrategy) -> Self {
        Self {
            strategy,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn select<'a>(&self, endpoints: &'a [ServiceEndpoint]) -> Option<&'a ServiceEndpoint> {
        if endpoints.is_empty() {
            return None;
        }

        let index = match self.strategy {
            SelectionStrategy::First => 0,
            SelectionStrategy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % endpoints.len()
            }
            SelectionStrategy::Random => rand::thread_rng().gen_range(0..endpoints.len()),
        };

        endpoints.get(index)
    }
}
