use crate::config::settings::{
    CacheBackend, CorsPolicy, DataStore, EmailBackend, FrameOptions, HstsPolicy, LogFileSettings,
    LogFormat, PasswordHasher, Settings,
};
use crate::config::Environment;

const PRODUCTION_LOG_PATH: &str = "logs/finance-api.log";
const PRODUCTION_LOG_MAX_BYTES: u64 = 15 * 1024 * 1024;
const PRODUCTION_LOG_BACKUPS: usize = 10;
const TEST_DATABASE_NAME: &str = "test_finance_tracker";

/// 在基礎設定上套用指定環境的差異，回傳新的設定
pub fn apply_overlay(base: Settings, environment: Environment) -> Settings {
    let mut settings = match environment {
        Environment::Development => development(base),
        Environment::Production => production(base),
        Environment::Testing => testing(base),
    };
    settings.environment = environment;
    settings
}

fn development(mut s: Settings) -> Settings {
    s.debug = true;
    s.server.allowed_hosts = vec!["*".to_string()];
    s.cors = CorsPolicy::AllowAll;
    s.logging.level = "debug".to_string();
    s.email = EmailBackend::Console;
    s.security.ssl_redirect = false;
    s
}

fn production(mut s: Settings) -> Settings {
    s.debug = false;

    s.security.ssl_redirect = true;
    s.security.session_cookie_secure = true;
    s.security.csrf_cookie_secure = true;
    s.security.browser_xss_filter = true;
    s.security.content_type_nosniff = true;
    s.security.frame_options = FrameOptions::Deny;
    s.security.hsts = Some(HstsPolicy {
        seconds: HstsPolicy::ONE_YEAR_SECONDS,
        include_subdomains: true,
        preload: true,
    });

    s.logging.format = LogFormat::Json;
    s.logging.file = Some(LogFileSettings {
        path: PRODUCTION_LOG_PATH.to_string(),
        max_bytes: PRODUCTION_LOG_MAX_BYTES,
        backup_count: PRODUCTION_LOG_BACKUPS,
        level: "error".to_string(),
    });

    // 正式環境必須真的寄信；基礎設定若不是 SMTP 則補上預設值
    if !s.email.delivers() {
        s.email = EmailBackend::Smtp {
            host: "localhost".to_string(),
            port: 587,
            use_tls: true,
        };
    }
    s
}

fn testing(mut s: Settings) -> Settings {
    s.debug = false;
    s.database = DataStore::Ephemeral {
        name: TEST_DATABASE_NAME.to_string(),
    };
    s.rate_limit.enabled = false;
    s.cache = CacheBackend::InMemory;
    s.tasks.always_eager = true;
    s.tasks.eager_propagates = true;
    s.password_hasher = PasswordHasher::Md5;
    s.email = EmailBackend::InMemory;
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_sets_environment() {
        for env in [
            Environment::Development,
            Environment::Production,
            Environment::Testing,
        ] {
            assert_eq!(apply_overlay(Settings::base(), env).environment, env);
        }
    }

    #[test]
    fn test_overlay_is_pure() {
        let base = Settings::base();
        let first = apply_overlay(base.clone(), Environment::Production);
        let second = apply_overlay(base.clone(), Environment::Production);
        assert_eq!(first, second);
        assert_eq!(base, Settings::base());
    }

    #[test]
    fn test_development_is_permissive() {
        let s = apply_overlay(Settings::base(), Environment::Development);
        assert!(s.debug);
        assert!(s.allows_any_host());
        assert_eq!(s.cors, CorsPolicy::AllowAll);
        assert_eq!(s.logging.level, "debug");
        assert!(!s.email.delivers());
    }

    #[test]
    fn test_production_keeps_custom_smtp() {
        let mut base = Settings::base();
        base.email = EmailBackend::Smtp {
            host: "smtp.example.com".to_string(),
            port: 465,
            use_tls: true,
        };
        let s = apply_overlay(base.clone(), Environment::Production);
        assert_eq!(s.email, base.email);
    }

    #[test]
    fn test_production_replaces_non_delivering_email() {
        let mut base = Settings::base();
        base.email = EmailBackend::Console;
        let s = apply_overlay(base, Environment::Production);
        assert!(s.email.delivers());
    }
}
