use crate::config::Environment;
use crate::core::health::HealthVariant;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

/// 服務設定：啟動時建立一次，之後以 `Arc<Settings>` 共享，不再變動
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_deserializing)]
    pub environment: Environment,
    pub debug: bool,
    pub service: ServiceInfo,
    pub server: ServerSettings,
    pub health: HealthSettings,
    pub security: SecuritySettings,
    pub cors: CorsPolicy,
    pub logging: LoggingSettings,
    pub database: DataStore,
    pub cache: CacheBackend,
    pub rate_limit: RateLimitSettings,
    pub tasks: TaskSettings,
    pub password_hasher: PasswordHasher,
    pub email: EmailBackend,
    pub auth: JwtSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceInfo {
    pub name: String,
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub variant: HealthVariant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub ssl_redirect: bool,
    /// 信任反向代理送來的 `X-Forwarded-Proto`；只在代理後方部署時開啟
    pub trust_forwarded_proto: bool,
    /// 以 `X-Forwarded-For` 第一個位址作為限流用的用戶端識別
    pub trust_forwarded_for: bool,
    pub session_cookie_secure: bool,
    pub csrf_cookie_secure: bool,
    pub browser_xss_filter: bool,
    pub content_type_nosniff: bool,
    pub frame_options: FrameOptions,
    pub hsts: Option<HstsPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOptions {
    Deny,
    SameOrigin,
    None,
}

impl FrameOptions {
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            FrameOptions::Deny => Some("DENY"),
            FrameOptions::SameOrigin => Some("SAMEORIGIN"),
            FrameOptions::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HstsPolicy {
    pub seconds: u64,
    pub include_subdomains: bool,
    pub preload: bool,
}

impl HstsPolicy {
    /// 一年期、含子網域並可預載
    pub const ONE_YEAR_SECONDS: u64 = 31_536_000;

    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.seconds);
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "origins", rename_all = "snake_case")]
pub enum CorsPolicy {
    AllowAll,
    AllowList(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<LogFileSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileSettings {
    pub path: String,
    pub max_bytes: u64,
    pub backup_count: usize,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataStore {
    Persistent { url: String, name: String },
    Ephemeral { name: String },
}

impl DataStore {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, DataStore::Ephemeral { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheBackend {
    Redis { url: String },
    InMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests_per_minute: u64,
    pub burst: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    pub broker_url: String,
    /// 同步執行工作，不交給背景任務
    pub always_eager: bool,
    pub eager_propagates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordHasher {
    Argon2,
    Pbkdf2Sha256,
    Md5,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmailBackend {
    Smtp { host: String, port: u32, use_tls: bool },
    Console,
    InMemory,
}

impl EmailBackend {
    pub fn delivers(&self) -> bool {
        matches!(self, EmailBackend::Smtp { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    pub access_token_lifetime_minutes: u64,
    pub refresh_token_lifetime_days: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            debug: false,
            service: ServiceInfo::default(),
            server: ServerSettings::default(),
            health: HealthSettings::default(),
            security: SecuritySettings::default(),
            cors: CorsPolicy::AllowList(Vec::new()),
            logging: LoggingSettings::default(),
            database: DataStore::Persistent {
                url: "mongodb://localhost:27017".to_string(),
                name: "finance_tracker".to_string(),
            },
            cache: CacheBackend::Redis {
                url: "redis://localhost:6379/1".to_string(),
            },
            rate_limit: RateLimitSettings::default(),
            tasks: TaskSettings::default(),
            password_hasher: PasswordHasher::Argon2,
            email: EmailBackend::Smtp {
                host: "localhost".to_string(),
                port: 587,
                use_tls: true,
            },
            auth: JwtSettings::default(),
        }
    }
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: "personal-finance-api".to_string(),
            title: "Personal Finance Tracker API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            variant: HealthVariant::Service,
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            ssl_redirect: false,
            trust_forwarded_proto: false,
            trust_forwarded_for: false,
            session_cookie_secure: false,
            csrf_cookie_secure: false,
            browser_xss_filter: false,
            content_type_nosniff: true,
            frame_options: FrameOptions::SameOrigin,
            hsts: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 100,
            burst: 100,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            broker_url: "redis://localhost:6379/0".to_string(),
            always_eager: false,
            eager_propagates: false,
        }
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            access_token_lifetime_minutes: 60,
            refresh_token_lifetime_days: 7,
        }
    }
}

impl Settings {
    /// 內建的基礎設定（尚未套用任何環境覆蓋）
    pub fn base() -> Self {
        Self::default()
    }

    /// 讀取基礎設定（檔案或內建），套用環境覆蓋後驗證
    pub fn load(environment: Environment, base_path: Option<&std::path::Path>) -> Result<Self> {
        let base = match base_path {
            Some(path) => {
                tracing::info!("📁 Loading base configuration from: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::base(),
        };

        let settings = crate::config::overlay::apply_overlay(base, environment);
        settings.validate()?;

        tracing::info!(
            environment = %settings.environment,
            debug = settings.debug,
            "✅ Settings loaded"
        );
        Ok(settings)
    }

    pub fn allows_any_host(&self) -> bool {
        self.server.allowed_hosts.iter().any(|h| h == "*")
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_socket_addr("server.bind_addr", &self.server.bind_addr)?;
        validation::validate_non_empty_list("server.allowed_hosts", &self.server.allowed_hosts)?;
        validation::validate_non_empty_string("service.name", &self.service.name)?;

        if self.rate_limit.enabled {
            validation::validate_positive_number(
                "rate_limit.requests_per_minute",
                self.rate_limit.requests_per_minute,
                1,
            )?;
            validation::validate_positive_number("rate_limit.burst", self.rate_limit.burst, 1)?;
        }

        if let Some(file) = &self.logging.file {
            validation::validate_path("logging.file.path", &file.path)?;
            validation::validate_positive_number("logging.file.max_bytes", file.max_bytes, 1)?;
        }

        validation::validate_url(
            "tasks.broker_url",
            &self.tasks.broker_url,
            &["redis", "rediss", "amqp", "memory"],
        )?;

        if let EmailBackend::Smtp { host, port, .. } = &self.email {
            validation::validate_non_empty_string("email.host", host)?;
            validation::validate_range("email.port", *port, 1, 65535)?;
        }

        if self.environment == Environment::Production {
            if self.debug {
                return Err(ApiError::InvalidConfigValueError {
                    field: "debug".to_string(),
                    value: "true".to_string(),
                    reason: "Debug mode must be disabled in production".to_string(),
                });
            }
            if self.allows_any_host() {
                return Err(ApiError::InvalidConfigValueError {
                    field: "server.allowed_hosts".to_string(),
                    value: "*".to_string(),
                    reason: "Wildcard hosts are not allowed in production".to_string(),
                });
            }
        }

        Ok(())
    }
}
