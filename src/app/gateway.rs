use crate::adapters::HttpRegistryResolver;
use crate::config::GatewayConfig;
use crate::core::aggregator::PassportAggregator;
use crate::core::client::RemoteClient;
use crate::core::handler::PassportHandler;
use crate::core::invoker::ResilientInvoker;
use crate::core::resolver::{EndpointSelector, StaticResolver};
use crate::domain::ports::EndpointResolver;
use crate::server::{self, AppState, GatewayHandler};
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::Validate;
use axum::Router;
use reqwest::Client;
use std::sync::Arc;

/// 由 GatewayConfig 組裝 resolver、clients、invoker 與 handler
pub struct GatewayApp {
    config: GatewayConfig,
    resolver: Arc<dyn EndpointResolver>,
    state: AppState,
}

impl GatewayApp {
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .build()
            .map_err(|e| GatewayError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let resolver: Arc<dyn EndpointResolver> = match &config.registry.endpoint {
            Some(endpoint) => {
                tracing::info!("🔎 Using service registry at {}", endpoint);
                Arc::new(HttpRegistryResolver::new(endpoint, http.clone())?)
            }
            None => {
                tracing::info!("🔎 Using static service instances from configuration");
                Arc::new(StaticResolver::new(config.static_instances()?))
            }
        };
        let selector = Arc::new(EndpointSelector::new(config.registry.selection));

        let mut invoker = ResilientInvoker::new(config.default_timeout());
        for (service, timeout) in config.timeout_overrides() {
            invoker = invoker.with_timeout(service, timeout);
        }
        if let Some(breaker) = config.circuit_breaker() {
            tracing::info!(
                "🔌 Circuit breaker enabled (threshold {}, reset {:?})",
                breaker.failure_threshold,
                breaker.reset_timeout
            );
            invoker = invoker.with_circuit_breaker(breaker);
        }
        let invoker = Arc::new(invoker);

        let bookmarks = RemoteClient::new(
            config.clients.bookmark_service.clone(),
            "bookmarks",
            Arc::clone(&resolver),
            Arc::clone(&selector),
            http.clone(),
        );
        let contacts = RemoteClient::new(
            config.clients.contact_service.clone(),
            "contacts",
            Arc::clone(&resolver),
            Arc::clone(&selector),
            http,
        );

        let state = AppState {
            metrics: invoker.metrics(),
            handler: Arc::new(PassportHandler::new(PassportAggregator::new(
                bookmarks, contacts, invoker,
            ))),
        };

        Ok(Self {
            config,
            resolver,
            state,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn handler(&self) -> Arc<GatewayHandler> {
        Arc::clone(&self.state.handler)
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// 啟動時列出每個下游服務目前註冊的實例
    pub async fn log_discovery_report(&self) {
        tracing::info!("------------------------------");
        tracing::info!("Discovery report");

        for service in [
            &self.config.clients.bookmark_service,
            &self.config.clients.contact_service,
        ] {
            match self.resolver.resolve(service).await {
                Ok(endpoints) if endpoints.is_empty() => {
                    tracing::warn!("⚠️ No instances registered for {}", service);
                }
                Ok(endpoints) => {
                    for endpoint in endpoints {
                        tracing::info!("  {} -> {}", service, endpoint);
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ Could not resolve {}: {}", service, e);
                }
            }
        }
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr()?;

        if let Some(message) = &self.config.server.message {
            tracing::info!("message = {}", message);
        }
        self.log_discovery_report().await;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("🚀 Passport gateway listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Passport gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
