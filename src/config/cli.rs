use crate::config::toml_config::GatewayConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "passport-gateway")]
#[command(about = "Aggregates bookmarks and contacts into a user passport")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override server.bind from config
    #[arg(long)]
    pub bind: Option<String>,

    /// Override clients.timeout_ms from config
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl CliConfig {
    /// 載入設定檔（若有）並套用命令列覆蓋
    pub fn load_gateway_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.clients.timeout_ms = timeout_ms;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_config_file() {
        let cli = CliConfig::parse_from(["passport-gateway"]);
        let config = cli.load_gateway_config().unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.clients.timeout_ms, 1000);
    }

    #[test]
    fn test_overrides_apply_over_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nbind = \"127.0.0.1:9000\"\n\n[clients]\ntimeout_ms = 500\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from([
            "passport-gateway",
            "--config",
            path.as_str(),
            "--timeout-ms",
            "250",
        ]);
        let config = cli.load_gateway_config().unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.clients.timeout_ms, 250);
    }
}
