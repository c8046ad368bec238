// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    parse_config(&contents, path.extension().and_then(|s| s.to_str()))
}

/// Parse configuration text; `extension` selects YAML (`yaml`/`yml`) or JSON.
pub fn parse_config(contents: &str, extension: Option<&str>) -> Result<Config> {
    let config: Config = match extension {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = parse_config("{}", Some("json")).unwrap();

        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.server.route, "/health");
        assert_eq!(config.checks.timeout(), Duration::from_secs(1));
        assert!(!config.metrics.enabled);
        assert!(config.probes.is_empty());
    }

    #[test]
    fn test_yaml_with_probes() {
        let yaml = r#"
server:
  address: "127.0.0.1:9000"
  route: "/status"
checks:
  timeout_ms: 500
  max_concurrency: 8
metrics:
  enabled: true
  port: 9100
probes:
  - path: "db/primary"
    tcp: "127.0.0.1:5432"
  - path: "upstream/api"
    http: "http://localhost:8081/health"
    timeout_ms: 250
"#;
        let config = parse_config(yaml, Some("yaml")).unwrap();

        assert_eq!(config.checks.max_concurrency, 8);
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.probes.len(), 2);
        assert!(matches!(config.probes[0].target, ProbeTarget::Tcp(ref a) if a == "127.0.0.1:5432"));
        assert!(matches!(config.probes[1].target, ProbeTarget::Http(_)));
        assert_eq!(config.probes[1].timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.probes[0].timeout(), None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse_config(r#"{"checks": {"timeout_ms": 0}}"#, None).is_err());
        assert!(parse_config(r#"{"checks": {"max_concurrency": 0}}"#, None).is_err());
        assert!(parse_config(r#"{"server": {"route": "health"}}"#, None).is_err());
        assert!(parse_config(r#"{"probes": [{"path": "", "tcp": "localhost:1"}]}"#, None).is_err());
    }
}
