pub mod health;
pub mod jobs;
pub mod routes;
pub mod schedule;

pub use crate::domain::model::{Component, HealthStatus, JobRun};
pub use crate::domain::ports::{JobContext, JobHandler};
pub use crate::utils::error::Result;
