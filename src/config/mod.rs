pub mod overlay;
pub mod settings;
pub mod toml_config;

pub use overlay::apply_overlay;
pub use settings::Settings;

use crate::utils::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 啟動時選擇環境覆蓋的環境變數
pub const ENV_VAR: &str = "FINANCE_API_ENV";
/// 基礎設定檔路徑
pub const CONFIG_PATH_VAR: &str = "FINANCE_API_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Testing => "testing",
        }
    }

    /// 從行程環境變數讀取
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// 未設定時使用 development；設定了但無法辨識則為致命錯誤
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match get(ENV_VAR) {
            Some(raw) if !raw.trim().is_empty() => raw.parse(),
            _ => Ok(Environment::Development),
        }
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "testing" | "test" => Ok(Environment::Testing),
            _ => Err(ApiError::UnknownEnvironment {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "cli")]
pub mod cli {
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "finance-api")]
    #[command(about = "Personal Finance Tracker API service")]
    #[command(version)]
    pub struct CliConfig {
        /// Configuration overlay: development, production or testing [env: FINANCE_API_ENV]
        #[arg(long, global = true)]
        pub env: Option<String>,

        /// Path to the base TOML configuration
        #[arg(long, global = true, env = super::CONFIG_PATH_VAR)]
        pub config: Option<PathBuf>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Option<Command>,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Run the HTTP service
        Serve {
            /// Override server.bind_addr
            #[arg(long)]
            bind: Option<String>,

            /// Run the job scheduler inside this process
            #[arg(long)]
            with_scheduler: bool,
        },
        /// Inspect or trigger scheduled jobs
        Jobs {
            #[command(subcommand)]
            action: JobsCommand,
        },
        /// Print the effective settings as JSON and exit
        CheckConfig,
        /// Query a running service's health endpoint
        Probe {
            #[arg(long, default_value = "http://127.0.0.1:8000/health/")]
            url: String,

            #[arg(long, default_value = "5")]
            timeout_secs: u64,
        },
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum JobsCommand {
        /// List declared jobs and their triggers
        List,
        /// Run one job now
        Run { name: String },
    }

    impl CliConfig {
        /// `--env` 優先，否則退回環境變數的預設規則
        pub fn environment(&self) -> crate::utils::error::Result<super::Environment> {
            match &self.env {
                Some(name) if !name.trim().is_empty() => name.parse(),
                _ => super::Environment::from_env(),
            }
        }
    }
}

#[cfg(feature = "cli")]
pub use cli::CliConfig;
