pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::{build_router, JobDispatcher, Scheduler};
pub use config::{Environment, Settings};
pub use crate::core::{health::HealthVariant, jobs::JobTable, routes::RouteTable};
pub use utils::error::{ApiError, Result};
