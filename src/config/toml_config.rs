use crate::config::settings::Settings;
use crate::utils::error::{ApiError, Result};
use regex::Regex;
use std::path::Path;

impl Settings {
    /// 從 TOML 檔案載入基礎設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ApiError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析基礎設定；未出現的欄位沿用內建值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ApiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }
}

/// 替換環境變數 (例如 ${BROKER_URL})，未定義的保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ApiError::ConfigError {
        message: format!("Invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{CacheBackend, DataStore};
    use crate::core::health::HealthVariant;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_is_builtin_base() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::base());
    }

    #[test]
    fn test_partial_document_overrides_base() {
        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"

[health]
variant = "detailed"

[database]
kind = "persistent"
url = "mongodb://db.internal:27017"
name = "finance"

[cache]
kind = "in_memory"

[rate_limit]
requests_per_minute = 30
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(settings.server.bind_addr, "127.0.0.1:9000");
        // 同一區段未填的欄位仍是內建值
        assert_eq!(settings.server.allowed_hosts, Settings::base().server.allowed_hosts);
        assert_eq!(settings.health.variant, HealthVariant::Detailed);
        assert_eq!(
            settings.database,
            DataStore::Persistent {
                url: "mongodb://db.internal:27017".to_string(),
                name: "finance".to_string(),
            }
        );
        assert_eq!(settings.cache, CacheBackend::InMemory);
        assert_eq!(settings.rate_limit.requests_per_minute, 30);
        assert!(settings.rate_limit.enabled);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FINANCE_TEST_BROKER_URL", "amqp://guest@rabbit//");

        let toml_content = r#"
[tasks]
broker_url = "${FINANCE_TEST_BROKER_URL}"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.tasks.broker_url, "amqp://guest@rabbit//");

        std::env::remove_var("FINANCE_TEST_BROKER_URL");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Settings::from_toml_str("[server\nbind_addr = 1").unwrap_err();
        assert!(matches!(err, ApiError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"debug = true\n[service]\nname = \"finance-from-file\"\n")
            .unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.service.name, "finance-from-file");
    }
}
