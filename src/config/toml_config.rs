use crate::core::breaker::CircuitBreakerConfig;
use crate::core::client::{BOOKMARK_SERVICE, CONTACT_SERVICE};
use crate::core::resolver::SelectionStrategy;
use crate::domain::model::ServiceEndpoint;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub clients: ClientsConfig,
    pub circuit_breaker: Option<CircuitBreakerSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub selection: SelectionStrategy,
    #[serde(default)]
    pub instances: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_bookmark_service")]
    pub bookmark_service: String,
    #[serde(default = "default_contact_service")]
    pub contact_service: String,
    #[serde(default)]
    pub timeouts: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_bookmark_service() -> String {
    BOOKMARK_SERVICE.to_string()
}

fn default_contact_service() -> String {
    CONTACT_SERVICE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            message: None,
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            bookmark_service: default_bookmark_service(),
            contact_service: default_contact_service(),
            timeouts: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GatewayError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${REGISTRY_URL})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind", &self.server.bind)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.clients.timeout_ms)
    }

    /// 各服務的逾時覆寫
    pub fn timeout_overrides(&self) -> impl Iterator<Item = (&str, Duration)> + '_ {
        self.clients
            .timeouts
            .iter()
            .map(|(service, ms)| (service.as_str(), Duration::from_millis(*ms)))
    }

    /// 解析 `registry.instances` 成服務實例表
    pub fn static_instances(&self) -> Result<HashMap<String, Vec<ServiceEndpoint>>> {
        self.registry
            .instances
            .iter()
            .map(|(service, addresses)| -> Result<(String, Vec<ServiceEndpoint>)> {
                let field = format!("registry.instances.{}", service);
                let endpoints = addresses
                    .iter()
                    .map(|address| validation::validate_endpoint(&field, address))
                    .collect::<Result<Vec<_>>>()?;
                Ok((service.clone(), endpoints))
            })
            .collect()
    }

    pub fn circuit_breaker(&self) -> Option<CircuitBreakerConfig> {
        self.circuit_breaker
            .as_ref()
            .map(|settings| CircuitBreakerConfig {
                failure_threshold: settings.failure_threshold,
                reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
            })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.bind_addr()?;

        if let Some(endpoint) = &self.registry.endpoint {
            validation::validate_url("registry.endpoint", endpoint)?;
        }
        self.static_instances()?;

        validation::validate_positive_number("clients.timeout_ms", self.clients.timeout_ms, 1)?;
        for (service, ms) in &self.clients.timeouts {
            validation::validate_non_empty_string("clients.timeouts", service)?;
            validation::validate_positive_number(
                &format!("clients.timeouts.{}", service),
                *ms,
                1,
            )?;
        }

        validation::validate_non_empty_string(
            "clients.bookmark_service",
            &self.clients.bookmark_service,
        )?;
        validation::validate_non_empty_string(
            "clients.contact_service",
            &self.clients.contact_service,
        )?;

        if let Some(breaker) = &self.circuit_breaker {
            validation::validate_positive_number(
                "circuit_breaker.failure_threshold",
                u64::from(breaker.failure_threshold),
                1,
            )?;
            validation::validate_positive_number(
                "circuit_breaker.reset_timeout_ms",
                breaker.reset_timeout_ms,
                1,
            )?;
        }

        Ok(())
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_any_section() {
        let config = GatewayConfig::from_toml_str("").unwrap();

        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.default_timeout(), Duration::from_millis(1000));
        assert_eq!(config.clients.bookmark_service, "bookmark-service");
        assert_eq!(config.clients.contact_service, "contact-service");
        assert_eq!(config.registry.selection, SelectionStrategy::First);
        assert!(config.circuit_breaker().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
bind = "127.0.0.1:9000"
message = "passport gateway up"

[registry]
selection = "round_robin"

[registry.instances]
bookmark-service = ["127.0.0.1:8081", "127.0.0.1:8083"]
contact-service = ["127.0.0.1:8082"]

[clients]
timeout_ms = 750

[clients.timeouts]
contact-service = 300

[circuit_breaker]
failure_threshold = 5
reset_timeout_ms = 10000
"#;

        let config = GatewayConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.server.message.as_deref(), Some("passport gateway up"));
        assert_eq!(config.registry.selection, SelectionStrategy::RoundRobin);

        let instances = config.static_instances().unwrap();
        assert_eq!(instances["bookmark-service"].len(), 2);
        assert_eq!(instances["contact-service"][0].port, 8082);

        let overrides: HashMap<&str, Duration> = config.timeout_overrides().collect();
        assert_eq!(overrides["contact-service"], Duration::from_millis(300));

        let breaker = config.circuit_breaker().unwrap();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.reset_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PASSPORT_TEST_REGISTRY", "http://registry.test:8761");

        let toml_content = r#"
[registry]
endpoint = "${PASSPORT_TEST_REGISTRY}"
"#;

        let config = GatewayConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.registry.endpoint.as_deref(),
            Some("http://registry.test:8761")
        );

        std::env::remove_var("PASSPORT_TEST_REGISTRY");
    }

    #[test]
    fn test_config_validation() {
        let invalid = [
            "[clients]\ntimeout_ms = 0\n",
            "[server]\nbind = \"not-an-address\"\n",
            "[registry]\nendpoint = \"ftp://registry\"\n",
            "[registry.instances]\nbookmark-service = [\"missing-port\"]\n",
            "[clients.timeouts]\ncontact-service = 0\n",
            "[circuit_breaker]\nfailure_threshold = 0\nreset_timeout_ms = 1000\n",
        ];

        for toml_content in invalid {
            let config = GatewayConfig::from_toml_str(toml_content).unwrap();
            assert!(config.validate().is_err(), "should reject: {}", toml_content);
        }
    }

    #[test]
    fn test_unknown_selection_is_parse_error() {
        let result = GatewayConfig::from_toml_str("[registry]\nselection = \"sticky\"\n");
        assert!(matches!(result, Err(GatewayError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[server]
bind = "127.0.0.1:8088"

[clients]
timeout_ms = 200
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = GatewayConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8088");
        assert_eq!(config.default_timeout(), Duration::from_millis(200));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = GatewayConfig::from_file("/definitely/not/here/gateway.toml");
        assert!(matches!(result, Err(GatewayError::IoError(_))));
    }
}
